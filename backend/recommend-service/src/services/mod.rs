/// Business logic layer: scoring math and recommendation orchestration.
pub mod recommendation;
pub mod scoring;

pub use recommendation::RecommendationService;
pub use scoring::{QueryType, RecommendationQuery};

/// Recommend Service Library
///
/// Ingests social post records into the Ripple record store and serves
/// user-to-user recommendations ranked by interaction history, hashtag
/// affinity, and keyword matches.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers for the recommendation endpoint
/// - `models`: Data structures for posts, users, and recommendation entries
/// - `services`: Scoring engine and recommendation orchestration
/// - `ingest`: Batch ingestion pipeline for newline-delimited post records
/// - `db`: Record store contract and its Postgres / in-memory backends
/// - `cache`: Process-wide TTL cache for computed recommendation lists
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

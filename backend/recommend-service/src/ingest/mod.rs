/// Batch ingestion pipeline for newline-delimited post records.
pub mod parser;
pub mod pipeline;

pub use pipeline::{BatchOutcome, IngestPipeline, IngestReport};

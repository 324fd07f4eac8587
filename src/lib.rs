pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod report;

// Domain data shapes shared across stages
pub mod domain;

// Re-export the types most callers need
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{CleanBatch, Pipeline, PipelineReport};

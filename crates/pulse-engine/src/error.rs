use thiserror::Error;

use pulse_core::{EmbedError, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller-supplied query parameters violate the search contract.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The embedding provider could not vectorize input. Surfaced to the
    /// caller, never retried here.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// The post store could not be reached or rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Batch quality fell below the configured threshold during a pipeline
    /// run. The run aborted and the watermark was left unchanged.
    #[error("batch validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<String> },
}

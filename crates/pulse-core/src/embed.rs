use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// The provider could not produce a vector for the input.
    #[error("embedding failure: {0}")]
    Failure(String),
    /// The provider did not answer within its deadline.
    #[error("embedding call timed out")]
    Timeout,
}

/// Dyn-compatible embedding provider.
///
/// Must be deterministic for identical input so query results are
/// reproducible against an unchanged store. All vectors returned by one
/// provider share a fixed dimension.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Batch form, required by the transform pipeline for throughput.
    /// Returns exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

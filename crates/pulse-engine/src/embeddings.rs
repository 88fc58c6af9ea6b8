//! TEI (Text Embeddings Inference) client implementing [`EmbeddingService`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use pulse_core::{EmbedError, EmbeddingService};

/// HTTP client for a TEI `/embed` endpoint.
///
/// TEI is deterministic for identical input, which the engine relies on for
/// reproducible search results.
pub struct TeiClient {
    client: reqwest::Client,
    url: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
}

impl TeiClient {
    /// Build a client with a per-request deadline.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Failure`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(tei_url: &str, timeout_secs: u64, batch_size: usize) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EmbedError::Failure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
            batch_size: batch_size.max(1),
        })
    }

    async fn embed_chunk(&self, chunk: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = EmbedRequest { inputs: chunk };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest)?;

        if !response.status().is_success() {
            return Err(EmbedError::Failure(format!(
                "TEI returned status {}",
                response.status()
            )));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| EmbedError::Failure(format!("TEI response parse error: {e}")))?;

        if embeddings.len() != chunk.len() {
            return Err(EmbedError::Failure(format!(
                "TEI returned {} embeddings for {} inputs",
                embeddings.len(),
                chunk.len()
            )));
        }

        Ok(embeddings)
    }
}

fn map_reqwest(e: reqwest::Error) -> EmbedError {
    if e.is_timeout() {
        EmbedError::Timeout
    } else {
        EmbedError::Failure(format!("TEI request failed: {e}"))
    }
}

#[async_trait]
impl EmbeddingService for TeiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_chunk(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Failure("TEI returned empty embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut all = Vec::with_capacity(texts.len());
        for chunk in refs.chunks(self.batch_size) {
            all.extend(self.embed_chunk(chunk).await?);
        }
        Ok(all)
    }
}

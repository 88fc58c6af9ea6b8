//! Shared test doubles: deterministic embedders over the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use pulse_core::{EmbedError, EmbeddingService, RawPost, SourceType};
use pulse_engine::PipelineConfig;

pub const TEST_DIM: usize = 8;

/// Deterministic embedder: a fixed-dimension vector derived from the text
/// bytes. Identical input always produces the identical vector.
pub struct HashEmbedder;

fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; TEST_DIM];
    for (i, b) in text.bytes().enumerate() {
        v[i % TEST_DIM] += f32::from(b) / 255.0;
    }
    v
}

#[async_trait]
impl EmbeddingService for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(hash_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

/// Embedder that returns the same fixed vector for every input; lets a test
/// pin the query embedding exactly.
pub struct StubEmbedder(pub Vec<f32>);

#[async_trait]
impl EmbeddingService for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.0.clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|_| self.0.clone()).collect())
    }
}

/// Embedder that always fails, for surfacing-error tests.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Failure("provider down".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Failure("provider down".to_string()))
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn raw_post(id: &str, text: &str, likes: i64, created_at: DateTime<Utc>) -> RawPost {
    RawPost {
        id: id.to_string(),
        text: text.to_string(),
        likes,
        shares: 0,
        comments: 0,
        source_type: SourceType::Customer,
        created_at,
        platform: "twitter".to_string(),
        author: "someone".to_string(),
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        pipeline_name: "bronze_to_silver".to_string(),
        embedding_dim: TEST_DIM,
        max_missing_text_fraction: 0.01,
        competitor_keywords: vec!["huawei".to_string(), "samsung".to_string()],
    }
}

//! Incremental transform pipeline: raw posts → processed posts, exactly once
//! per post, resumable after failure.
//!
//! Stages per run: load watermark → fetch batch → clean → deduplicate →
//! score and classify → embed → validate → persist + advance watermark
//! (atomic). A failure before persist aborts the run with the watermark
//! unchanged; the next run re-fetches the same batch, and upsert-by-id makes
//! the retry idempotent.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use pulse_core::{AppConfig, EmbeddingService, PostStore, ProcessedPost};

use crate::clean::{classify_source, clean_text, content_hash, engagement_score};
use crate::error::EngineError;
use crate::validate::validate_batch;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    pub embedding_dim: usize,
    pub max_missing_text_fraction: f32,
    pub competitor_keywords: Vec<String>,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            pipeline_name: config.pipeline_name.clone(),
            embedding_dim: config.embedding_dim,
            max_missing_text_fraction: config.max_missing_text_fraction,
            competitor_keywords: config.competitor_keywords.clone(),
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub fetched: usize,
    pub duplicates_dropped: usize,
    pub processed: usize,
    pub validation_errors: Vec<String>,
    /// Watermark after the run (unchanged when the batch was empty).
    pub watermark: Option<DateTime<Utc>>,
}

/// Single-writer batch pipeline. Concurrent runs are detected by the
/// store's compare-and-swap watermark advance, never by local locking.
pub struct TransformPipeline {
    store: Arc<dyn PostStore>,
    embedder: Arc<dyn EmbeddingService>,
    config: PipelineConfig,
}

impl TransformPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn PostStore>,
        embedder: Arc<dyn EmbeddingService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run one incremental batch.
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] if the store fails or the watermark CAS loses
    /// to a concurrent run; [`EngineError::Embedding`] if the batch embed
    /// call fails (no partial embedding); [`EngineError::Validation`] if the
    /// missing-text fraction exceeds the configured threshold. In every
    /// failure case the watermark is left unchanged.
    pub async fn run(&self) -> Result<PipelineReport, EngineError> {
        let pipeline = self.config.pipeline_name.as_str();

        let watermark = self.store.get_watermark(pipeline).await?;
        tracing::info!(pipeline, ?watermark, "starting incremental batch");

        let batch = self.store.fetch_raw_since(watermark).await?;
        if batch.is_empty() {
            tracing::info!(pipeline, "no new posts to process");
            return Ok(PipelineReport {
                fetched: 0,
                duplicates_dropped: 0,
                processed: 0,
                validation_errors: Vec::new(),
                watermark,
            });
        }
        let fetched = batch.len();

        // The new watermark is the newest created_at in the fetched batch,
        // not the wall clock: posts arriving later with earlier stamps are
        // still beyond it and get picked up next run.
        let new_watermark = batch
            .iter()
            .map(|p| p.created_at)
            .max()
            .unwrap_or_else(Utc::now);

        // Clean + deduplicate: first occurrence of a normalized-content hash
        // wins within the batch.
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(batch.len());
        for post in batch {
            if seen.insert(content_hash(&post.text)) {
                unique.push(post);
            }
        }
        let duplicates_dropped = fetched - unique.len();
        tracing::debug!(pipeline, fetched, duplicates_dropped, "batch deduplicated");

        let cleaned: Vec<String> = unique.iter().map(|p| clean_text(&p.text)).collect();

        // Whole-batch embed: a failure here fails the run, no partial state.
        let embeddings = self.embedder.embed_batch(&cleaned).await?;
        if embeddings.len() != unique.len() {
            return Err(EngineError::Embedding(pulse_core::EmbedError::Failure(
                format!(
                    "provider returned {} embeddings for {} texts",
                    embeddings.len(),
                    unique.len()
                ),
            )));
        }

        let processed: Vec<ProcessedPost> = unique
            .iter()
            .zip(cleaned)
            .zip(embeddings)
            .map(|((raw, cleaned_text), embedding)| ProcessedPost {
                id: raw.id.clone(),
                cleaned_text,
                engagement_score: engagement_score(raw.likes, raw.shares, raw.comments),
                embedding,
                source_type: classify_source(
                    &raw.author,
                    &raw.text,
                    &self.config.competitor_keywords,
                ),
                created_at: raw.created_at,
            })
            .collect();

        let report = validate_batch(&processed, self.config.embedding_dim);
        for warning in &report.warnings {
            tracing::warn!(pipeline, "{warning}");
        }
        if report.missing_text_fraction() > self.config.max_missing_text_fraction {
            let mut errors = report.errors;
            errors.push(format!(
                "{} of {} posts have empty cleaned text (limit {:.2}%)",
                report.missing_text,
                report.total,
                self.config.max_missing_text_fraction * 100.0
            ));
            tracing::error!(pipeline, errors = errors.len(), "batch failed validation");
            return Err(EngineError::Validation { errors });
        }

        // Persist and advance together: the advance never happens without
        // this batch's upserts committing in the same transaction.
        self.store
            .commit_batch(pipeline, watermark, new_watermark, &processed)
            .await?;

        tracing::info!(
            pipeline,
            processed = processed.len(),
            new_watermark = %new_watermark,
            "batch committed"
        );
        Ok(PipelineReport {
            fetched,
            duplicates_dropped,
            processed: processed.len(),
            validation_errors: report.errors,
            watermark: Some(new_watermark),
        })
    }
}

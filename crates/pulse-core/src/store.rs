use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{InsightBundle, ProcessedPost, RawPost};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    /// Transient; the caller may retry with backoff, the core never does.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A store call exceeded its deadline.
    #[error("store call timed out")]
    Timeout,
    /// The watermark compare-and-swap failed: another run advanced it since
    /// this run loaded it. The batch was rolled back.
    #[error("watermark advanced concurrently for pipeline '{0}'")]
    WatermarkConflict(String),
}

/// Keyed store of raw and processed posts plus per-pipeline watermarks.
///
/// Implementations must provide read consistency for concurrent queries;
/// the single-writer discipline for the watermark is enforced here via the
/// compare-and-swap in [`PostStore::commit_batch`].
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert raw posts by id. The raw tier is immutable: an id that already
    /// exists is left untouched.
    async fn upsert_raw(&self, posts: &[RawPost]) -> Result<(), StoreError>;

    /// Raw posts with `created_at` strictly after `since`, newest first.
    /// `None` selects the entire raw tier.
    async fn fetch_raw_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPost>, StoreError>;

    /// The `k` processed posts nearest to `embedding` by cosine distance,
    /// restricted to `engagement_score >= min_engagement`. Returns each post
    /// with its cosine similarity, most similar first.
    async fn query_nearest(
        &self,
        embedding: &[f32],
        min_engagement: f32,
        k: usize,
    ) -> Result<Vec<(ProcessedPost, f32)>, StoreError>;

    async fn get_watermark(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Atomically upsert a batch of processed posts and advance the named
    /// pipeline's watermark from `expected` to `new_watermark`.
    ///
    /// The advance is conditional: if the stored watermark no longer equals
    /// `expected`, nothing is written and [`StoreError::WatermarkConflict`]
    /// is returned. Either the whole batch and the advance commit together
    /// or neither is observed by subsequent reads.
    async fn commit_batch(
        &self,
        pipeline: &str,
        expected: Option<DateTime<Utc>>,
        new_watermark: DateTime<Utc>,
        posts: &[ProcessedPost],
    ) -> Result<(), StoreError>;

    /// Archive a denormalized copy of an insight bundle for auditing.
    /// Never on the query path; callers treat failure as non-fatal.
    async fn archive_insights(&self, query: &str, bundle: &InsightBundle)
        -> Result<(), StoreError>;
}

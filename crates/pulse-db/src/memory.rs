//! In-memory [`PostStore`] with the same semantics as [`crate::PgStore`].
//!
//! Nearest-neighbour queries are a linear scan over the processed tier, so
//! this is only suitable for tests and small local datasets.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pulse_core::{InsightBundle, PostStore, ProcessedPost, RawPost, StoreError};

#[derive(Default)]
struct Inner {
    raw: BTreeMap<String, RawPost>,
    processed: BTreeMap<String, ProcessedPost>,
    watermarks: HashMap<String, DateTime<Utc>>,
    archived: Vec<(String, InsightBundle)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the processed tier, ordered by post id.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn processed_posts(&self) -> Vec<ProcessedPost> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.processed.values().cloned().collect()
    }

    /// Number of archived insight bundles.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn archived_bundles(&self) -> usize {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.archived.len()
    }
}

// Matches the engine's cosine definition: zero-norm vectors compare as 0.0
// so the ordering stays total.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn upsert_raw(&self, posts: &[RawPost]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        for post in posts {
            // Raw tier is immutable: first write wins.
            inner.raw.entry(post.id.clone()).or_insert_with(|| post.clone());
        }
        Ok(())
    }

    async fn fetch_raw_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPost>, StoreError> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        let mut posts: Vec<RawPost> = inner
            .raw
            .values()
            .filter(|p| since.is_none_or(|ts| p.created_at > ts))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        min_engagement: f32,
        k: usize,
    ) -> Result<Vec<(ProcessedPost, f32)>, StoreError> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        let mut scored: Vec<(ProcessedPost, f32)> = inner
            .processed
            .values()
            .filter(|p| p.engagement_score >= min_engagement)
            .map(|p| {
                let sim = cosine(embedding, &p.embedding);
                (p.clone(), sim)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.created_at.cmp(&a.0.created_at))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_watermark(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        Ok(inner.watermarks.get(pipeline).copied())
    }

    async fn commit_batch(
        &self,
        pipeline: &str,
        expected: Option<DateTime<Utc>>,
        new_watermark: DateTime<Utc>,
        posts: &[ProcessedPost],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;

        if inner.watermarks.get(pipeline).copied() != expected {
            return Err(StoreError::WatermarkConflict(pipeline.to_string()));
        }

        for post in posts {
            inner.processed.insert(post.id.clone(), post.clone());
        }
        inner.watermarks.insert(pipeline.to_string(), new_watermark);
        Ok(())
    }

    async fn archive_insights(
        &self,
        query: &str,
        bundle: &InsightBundle,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.archived.push((query.to_string(), bundle.clone()));
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("store mutex poisoned".to_string())
}

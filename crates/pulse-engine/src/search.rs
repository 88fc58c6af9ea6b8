//! Similarity search and insight queries against the post store.

use std::sync::Arc;

use pulse_core::{EmbeddingService, InsightBundle, PostStore, SimilarityResult};

use crate::error::EngineError;
use crate::insights::classify;

/// Over-fetch factor for insight queries: the classifier sees a wider slice
/// of the ranked space than the caller asked for, then truncates per bucket.
const INSIGHT_CANDIDATE_FACTOR: usize = 4;

/// Query-side engine: vector similarity search plus insight classification.
///
/// Stateless apart from its injected collaborators; arbitrarily many queries
/// may run concurrently. Every query recomputes from current store state.
pub struct InsightEngine {
    store: Arc<dyn PostStore>,
    embedder: Arc<dyn EmbeddingService>,
}

impl InsightEngine {
    #[must_use]
    pub fn new(store: Arc<dyn PostStore>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self { store, embedder }
    }

    /// Find posts similar to `query_text`, ranked by cosine similarity
    /// descending with ties broken by `created_at` descending.
    ///
    /// Results below `min_similarity` or with engagement below
    /// `engagement_threshold` are excluded; at most `top_k` are returned.
    /// An empty result set is a valid, non-error outcome.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidQuery`] for out-of-contract parameters,
    /// [`EngineError::Embedding`] if the provider cannot vectorize the
    /// query, [`EngineError::Store`] if the store cannot be reached. No
    /// internal retries — retry policy belongs to the caller.
    pub async fn search(
        &self,
        query_text: &str,
        top_k: usize,
        engagement_threshold: f32,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityResult>, EngineError> {
        if top_k == 0 {
            return Err(EngineError::InvalidQuery("top_k must be > 0".to_string()));
        }
        if engagement_threshold < 0.0 {
            return Err(EngineError::InvalidQuery(
                "engagement_threshold must be >= 0".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&min_similarity) {
            return Err(EngineError::InvalidQuery(
                "min_similarity must be in [-1, 1]".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(query_text).await?;
        let candidates = self
            .store
            .query_nearest(&query_embedding, engagement_threshold, top_k)
            .await?;

        let mut results: Vec<SimilarityResult> = candidates
            .into_iter()
            .filter(|(_, similarity)| *similarity >= min_similarity)
            .map(|(post, similarity)| SimilarityResult {
                post_id: post.id,
                cleaned_text: post.cleaned_text,
                similarity,
                engagement_score: post.engagement_score,
                source_type: post.source_type,
                created_at: post.created_at,
            })
            .collect();

        // Deterministic ranking: similarity descending, newest first on ties.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        results.truncate(top_k);

        tracing::debug!(
            query = query_text,
            returned = results.len(),
            top_k,
            "similarity search complete"
        );
        Ok(results)
    }

    /// Derive categorized marketing insights for `query_text`.
    ///
    /// Fetches `top_k * 4` candidates at or above `similarity_threshold`
    /// with no engagement floor, then classifies that single result set —
    /// the same set the thresholds are computed over.
    ///
    /// # Errors
    ///
    /// Same error surface as [`InsightEngine::search`].
    pub async fn get_insights(
        &self,
        query_text: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<InsightBundle, EngineError> {
        let candidates = self
            .search(
                query_text,
                top_k.saturating_mul(INSIGHT_CANDIDATE_FACTOR),
                0.0,
                similarity_threshold,
            )
            .await?;
        Ok(classify(&candidates, top_k))
    }
}

//! Integration tests for similarity search and insight queries over the
//! in-memory store.

mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ts, FailingEmbedder, StubEmbedder, TEST_DIM};
use pulse_core::{PostStore, ProcessedPost, SourceType};
use pulse_db::MemoryStore;
use pulse_engine::{EngineError, InsightEngine};

fn post(id: &str, embedding: Vec<f32>, engagement: f32, created_at: DateTime<Utc>) -> ProcessedPost {
    ProcessedPost {
        id: id.to_string(),
        cleaned_text: format!("content of {id}"),
        engagement_score: engagement,
        embedding,
        source_type: SourceType::Customer,
        created_at,
    }
}

fn axis(direction: usize, scale: f32) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[direction] = scale;
    v
}

fn blend(a: f32, b: f32) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[0] = a;
    v[1] = b;
    v
}

async fn seed(store: &MemoryStore, posts: &[ProcessedPost]) {
    store
        .commit_batch("seed", None, Utc::now(), posts)
        .await
        .unwrap();
}

fn engine(store: Arc<MemoryStore>, query_embedding: Vec<f32>) -> InsightEngine {
    InsightEngine::new(store, Arc::new(StubEmbedder(query_embedding)))
}

#[tokio::test]
async fn ranks_by_similarity_descending() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("far", axis(1, 1.0), 1.0, ts(1, 9)),
            post("near", axis(0, 1.0), 1.0, ts(1, 9)),
            post("middle", blend(1.0, 1.0), 1.0, ts(1, 9)),
        ],
    )
    .await;

    let results = engine(store, axis(0, 1.0))
        .search("query", 10, 0.0, -1.0)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.post_id.as_str()).collect();
    assert_eq!(ids, ["near", "middle", "far"]);
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
    assert!(results[1].similarity > results[2].similarity);
}

#[tokio::test]
async fn equal_similarity_breaks_ties_newest_first() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("older", axis(0, 1.0), 1.0, ts(2, 8)),
            post("newer", axis(0, 2.0), 1.0, ts(2, 12)),
        ],
    )
    .await;

    let results = engine(store, axis(0, 1.0))
        .search("query", 10, 0.0, -1.0)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.post_id.as_str()).collect();
    assert_eq!(ids, ["newer", "older"], "cosine ignores scale; newest wins the tie");
}

#[tokio::test]
async fn min_similarity_filters_to_empty_without_error() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[post("far", axis(1, 1.0), 1.0, ts(3, 9))]).await;

    let results = engine(store, axis(0, 1.0))
        .search("query", 10, 0.0, 0.95)
        .await
        .unwrap();

    assert!(results.is_empty(), "empty result set is a valid outcome");
}

#[tokio::test]
async fn engagement_threshold_excludes_low_engagement_posts() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("quiet", axis(0, 1.0), 0.5, ts(4, 9)),
            post("loud", axis(0, 1.0), 50.0, ts(4, 9)),
        ],
    )
    .await;

    let results = engine(store, axis(0, 1.0))
        .search("query", 10, 10.0, -1.0)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.post_id.as_str()).collect();
    assert_eq!(ids, ["loud"]);
}

#[tokio::test]
async fn truncates_to_top_k() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("a", axis(0, 1.0), 1.0, ts(5, 9)),
            post("b", blend(1.0, 0.2), 1.0, ts(5, 9)),
            post("c", blend(1.0, 0.5), 1.0, ts(5, 9)),
        ],
    )
    .await;

    let results = engine(store, axis(0, 1.0))
        .search("query", 2, 0.0, -1.0)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn identical_queries_return_identical_rankings() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("a", blend(0.7, 0.3), 2.0, ts(6, 9)),
            post("b", blend(0.4, 0.9), 5.0, ts(6, 10)),
            post("c", blend(0.9, 0.1), 1.0, ts(6, 11)),
        ],
    )
    .await;
    let eng = engine(store, blend(1.0, 0.5));

    let first = eng.search("query", 10, 0.0, -1.0).await.unwrap();
    let second = eng.search("query", 10, 0.0, -1.0).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn rejects_out_of_contract_parameters() {
    let store = Arc::new(MemoryStore::new());
    let eng = engine(store, axis(0, 1.0));

    let err = eng.search("q", 0, 0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuery(_)));

    let err = eng.search("q", 5, -1.0, 0.0).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuery(_)));

    let err = eng.search("q", 5, 0.0, 1.5).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuery(_)));
}

#[tokio::test]
async fn embedding_failure_surfaces_to_the_caller() {
    let store = Arc::new(MemoryStore::new());
    let eng = InsightEngine::new(store, Arc::new(FailingEmbedder));
    let err = eng.search("q", 5, 0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, EngineError::Embedding(_)), "got: {err:?}");
}

#[tokio::test]
async fn get_insights_classifies_the_fetched_result_set() {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            post("star", axis(0, 1.0), 100.0, ts(7, 9)),
            post("solid", blend(1.0, 0.1), 40.0, ts(7, 9)),
            post("meh", blend(1.0, 0.2), 10.0, ts(7, 9)),
            post("flop", blend(1.0, 0.3), 0.0, ts(7, 9)),
        ],
    )
    .await;

    let bundle = engine(store, axis(0, 1.0))
        .get_insights("query", 2, -1.0)
        .await
        .unwrap();

    assert!(bundle
        .high_value_content
        .iter()
        .any(|r| r.post_id == "star"));
    assert!(bundle.content_gaps.iter().any(|r| r.post_id == "flop"));
    assert!(bundle.engagement_metrics.max_engagement >= 100.0);
    assert!(
        bundle.engagement_metrics.high_engagement_threshold
            >= bundle.engagement_metrics.low_engagement_threshold
    );
    assert!(!bundle.top_topics.is_empty(), "cleaned_text produces topics");
}

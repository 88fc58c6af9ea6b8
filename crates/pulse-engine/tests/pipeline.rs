//! Integration tests for the incremental transform pipeline over the
//! in-memory store and a deterministic embedder.

mod common;

use std::sync::Arc;

use common::{pipeline_config, raw_post, ts, FailingEmbedder, HashEmbedder};
use pulse_core::{PostStore, SourceType, StoreError};
use pulse_db::MemoryStore;
use pulse_engine::{EngineError, TransformPipeline};

fn pipeline(store: Arc<MemoryStore>) -> TransformPipeline {
    TransformPipeline::new(store, Arc::new(HashEmbedder), pipeline_config())
}

#[tokio::test]
async fn processes_a_batch_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[
            raw_post("t1", "Battery life is great https://example.com/x", 10, ts(1, 9)),
            raw_post("t2", "Screen is too dim :(", 4, ts(1, 10)),
        ])
        .await
        .unwrap();

    let report = pipeline(Arc::clone(&store)).run().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.processed, 2);
    assert_eq!(report.duplicates_dropped, 0);
    assert_eq!(report.watermark, Some(ts(1, 10)));

    let posts = store.processed_posts();
    assert_eq!(posts.len(), 2);
    let t1 = posts.iter().find(|p| p.id == "t1").unwrap();
    assert_eq!(t1.cleaned_text, "Battery life is great");
    assert!((t1.engagement_score - 2.0).abs() < 1e-6, "0.2 * 10 likes");
    assert_eq!(t1.source_type, SourceType::Customer);
    assert_eq!(t1.embedding.len(), common::TEST_DIM);
}

#[tokio::test]
async fn second_run_is_idempotent_and_advances_watermark_once() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[
            raw_post("t1", "first post content", 1, ts(2, 8)),
            raw_post("t2", "second post content", 2, ts(2, 9)),
        ])
        .await
        .unwrap();
    let p = pipeline(Arc::clone(&store));

    let first = p.run().await.unwrap();
    let posts_after_first = store.processed_posts();

    let second = p.run().await.unwrap();
    let posts_after_second = store.processed_posts();

    assert_eq!(first.processed, 2);
    assert_eq!(second.fetched, 0, "nothing beyond the watermark");
    assert_eq!(second.watermark, first.watermark);
    assert_eq!(
        format!("{posts_after_first:?}"),
        format!("{posts_after_second:?}"),
        "store content must be identical after the no-op second run"
    );
}

#[tokio::test]
async fn only_posts_beyond_the_watermark_are_fetched() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[raw_post("old", "early post", 1, ts(3, 8))])
        .await
        .unwrap();
    let p = pipeline(Arc::clone(&store));
    p.run().await.unwrap();

    store
        .upsert_raw(&[raw_post("new", "later post", 1, ts(3, 12))])
        .await
        .unwrap();
    let report = p.run().await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.watermark, Some(ts(3, 12)));
    assert_eq!(store.processed_posts().len(), 2);
}

#[tokio::test]
async fn duplicate_content_within_a_batch_keeps_first_occurrence() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[
            raw_post("a", "Same Thing Said Twice", 1, ts(4, 10)),
            raw_post("b", "  same thing said twice ", 9, ts(4, 9)),
        ])
        .await
        .unwrap();

    let report = pipeline(Arc::clone(&store)).run().await.unwrap();

    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.processed, 1);
    // Newest-first fetch order: "a" (10:00) is the first occurrence.
    assert_eq!(store.processed_posts()[0].id, "a");
}

#[tokio::test]
async fn missing_text_over_threshold_aborts_without_advancing() {
    let store = Arc::new(MemoryStore::new());
    // Cleans to empty: the whole post is one URL.
    store
        .upsert_raw(&[raw_post("u1", "https://example.com/only-a-link", 1, ts(5, 8))])
        .await
        .unwrap();

    let err = pipeline(Arc::clone(&store)).run().await.unwrap_err();

    assert!(
        matches!(err, EngineError::Validation { ref errors } if !errors.is_empty()),
        "expected Validation, got: {err:?}"
    );
    assert!(store.processed_posts().is_empty(), "nothing persisted");
    assert_eq!(
        store.get_watermark("bronze_to_silver").await.unwrap(),
        None,
        "watermark untouched on abort"
    );
}

#[tokio::test]
async fn embed_failure_fails_the_run_with_watermark_untouched() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[raw_post("t1", "some text", 1, ts(6, 8))])
        .await
        .unwrap();

    let p = TransformPipeline::new(
        Arc::clone(&store) as Arc<dyn PostStore>,
        Arc::new(FailingEmbedder),
        pipeline_config(),
    );
    let err = p.run().await.unwrap_err();

    assert!(matches!(err, EngineError::Embedding(_)), "got: {err:?}");
    assert!(store.processed_posts().is_empty());
    assert_eq!(store.get_watermark("bronze_to_silver").await.unwrap(), None);
}

#[tokio::test]
async fn dimension_violations_are_recorded_but_do_not_block_persist() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_raw(&[raw_post("t1", "regular text here", 1, ts(7, 8))])
        .await
        .unwrap();

    // Config expects 384 dims; the test embedder emits 8.
    let mut config = pipeline_config();
    config.embedding_dim = 384;
    let p = TransformPipeline::new(
        Arc::clone(&store) as Arc<dyn PostStore>,
        Arc::new(HashEmbedder),
        config,
    );
    let report = p.run().await.unwrap();

    assert!(!report.validation_errors.is_empty());
    assert_eq!(report.processed, 1, "violations recorded, batch still committed");
    assert_eq!(store.processed_posts().len(), 1);
}

#[tokio::test]
async fn stale_watermark_commit_is_rejected() {
    let store = MemoryStore::new();
    // Advance the watermark once.
    store
        .commit_batch("bronze_to_silver", None, ts(8, 10), &[])
        .await
        .unwrap();

    // A second committer that read `None` before the advance must lose.
    let err = store
        .commit_batch("bronze_to_silver", None, ts(8, 11), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::WatermarkConflict(_)), "got: {err:?}");

    // With the current value as `expected`, the advance succeeds.
    store
        .commit_batch("bronze_to_silver", Some(ts(8, 10)), ts(8, 12), &[])
        .await
        .unwrap();
    assert_eq!(
        store.get_watermark("bronze_to_silver").await.unwrap(),
        Some(ts(8, 12))
    );
}

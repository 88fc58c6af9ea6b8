//! Marketing-insight engine: semantic search over embedded social posts,
//! quartile-based insight classification, and the incremental batch pipeline
//! that moves raw posts into the processed tier.
//!
//! The engine is constructed with a [`pulse_core::PostStore`] and a
//! [`pulse_core::EmbeddingService`]; it performs no caching and no retries.
//! Every query recomputes from current store state, and retry policy belongs
//! to the caller.

pub mod clean;
pub mod embeddings;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod search;
pub mod similarity;
pub mod validate;

pub use embeddings::TeiClient;
pub use error::EngineError;
pub use insights::classify;
pub use pipeline::{PipelineConfig, PipelineReport, TransformPipeline};
pub use search::InsightEngine;
pub use similarity::cosine_similarity;

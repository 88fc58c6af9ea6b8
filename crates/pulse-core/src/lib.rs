//! Shared types, configuration, and collaborator traits for the pulse
//! marketing-insight engine.
//!
//! The engine itself lives in `pulse-engine`; this crate defines the records
//! that flow between the tiers (raw → processed → insights), the env-driven
//! application config, and the `PostStore` / `EmbeddingService` traits the
//! engine is constructed with.

mod config;
mod embed;
mod store;
mod types;

pub use config::{load_app_config, load_app_config_from_env, AppConfig, ConfigError};
pub use embed::{EmbedError, EmbeddingService};
pub use store::{PostStore, StoreError};
pub use types::{
    EngagementMetrics, InsightBundle, ProcessedPost, RawPost, SimilarityResult, SourceType,
    TopicScore, Watermark,
};

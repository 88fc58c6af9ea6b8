use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a post, relative to the company being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Customer,
    Competitor,
    Reviewer,
}

impl SourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Customer => "Customer",
            SourceType::Competitor => "Competitor",
            SourceType::Reviewer => "Reviewer",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(SourceType::Customer),
            "Competitor" => Ok(SourceType::Competitor),
            "Reviewer" => Ok(SourceType::Reviewer),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A social-media post as ingested, before any transformation.
///
/// Immutable once written; `id` is platform-qualified and unique across the
/// raw tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub text: String,
    pub likes: i64,
    pub shares: i64,
    pub comments: i64,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub platform: String,
    pub author: String,
}

/// A post after cleaning, scoring, and embedding. Derived from exactly one
/// [`RawPost`] and keyed by the same id.
///
/// `embedding` always has the provider's fixed dimension; `cleaned_text` may
/// be empty but is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPost {
    pub id: String,
    pub cleaned_text: String,
    pub engagement_score: f32,
    pub embedding: Vec<f32>,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
}

/// One ranked hit from a similarity search. Produced per query, never stored
/// as a first-class entity (a denormalized copy may be archived for audit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub post_id: String,
    pub cleaned_text: String,
    /// Cosine similarity against the query embedding, in `[-1, 1]`.
    pub similarity: f32,
    pub engagement_score: f32,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
}

/// A topic extracted from a result set, with frequency normalized against
/// the most frequent topic (`score` in `(0, 1]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic: String,
    pub score: f32,
}

/// Engagement statistics over one classified result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub avg_engagement: f32,
    pub max_engagement: f32,
    pub high_engagement_threshold: f32,
    pub low_engagement_threshold: f32,
}

impl EngagementMetrics {
    /// All-zero metrics, the defined value for an empty result set.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            avg_engagement: 0.0,
            max_engagement: 0.0,
            high_engagement_threshold: 0.0,
            low_engagement_threshold: 0.0,
        }
    }
}

/// Categorized marketing insights for one query. Recomputed per query, never
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightBundle {
    pub high_value_content: Vec<SimilarityResult>,
    pub content_gaps: Vec<SimilarityResult>,
    pub top_topics: Vec<TopicScore>,
    pub engagement_metrics: EngagementMetrics,
}

impl InsightBundle {
    /// The defined result for an empty input: all sequences empty, metrics 0.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            high_value_content: Vec::new(),
            content_gaps: Vec::new(),
            top_topics: Vec::new(),
            engagement_metrics: EngagementMetrics::zero(),
        }
    }
}

/// The timestamp boundary up to which a named pipeline has successfully
/// processed input. Owned and advanced only by that pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watermark {
    pub pipeline_name: String,
    pub last_successful_position: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_round_trips_through_str() {
        for st in [
            SourceType::Customer,
            SourceType::Competitor,
            SourceType::Reviewer,
        ] {
            let parsed: SourceType = st.as_str().parse().expect("round trip");
            assert_eq!(parsed, st);
        }
    }

    #[test]
    fn source_type_rejects_unknown() {
        assert!("influencer".parse::<SourceType>().is_err());
    }

    #[test]
    fn empty_bundle_has_zero_metrics() {
        let bundle = InsightBundle::empty();
        assert!(bundle.high_value_content.is_empty());
        assert!(bundle.content_gaps.is_empty());
        assert!(bundle.top_topics.is_empty());
        assert_eq!(bundle.engagement_metrics, EngagementMetrics::zero());
    }
}

//! Batch quality validation for the transform pipeline.

use pulse_core::ProcessedPost;

/// Engagement above this is flagged as suspicious (business rule: no post
/// legitimately exceeds 10M weighted engagement).
const SUSPICIOUS_ENGAGEMENT: f32 = 10_000_000.0;

/// Outcome of validating one processed batch. Errors are recorded per
/// record; whether they abort the run is the pipeline's decision.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub total: usize,
    pub missing_text: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Fraction of the batch with empty cleaned text, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn missing_text_fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.missing_text as f32 / self.total as f32
    }
}

/// Validate a processed batch: every post must carry an embedding of the
/// provider's dimension and a non-negative engagement score. Empty cleaned
/// text is counted but is not itself an error — the pipeline aborts only
/// when the missing-text fraction crosses its configured threshold.
#[must_use]
pub fn validate_batch(posts: &[ProcessedPost], embedding_dim: usize) -> ValidationReport {
    let mut report = ValidationReport {
        total: posts.len(),
        ..ValidationReport::default()
    };

    for post in posts {
        if post.embedding.len() != embedding_dim {
            report.errors.push(format!(
                "post {}: embedding has {} dimensions, expected {embedding_dim}",
                post.id,
                post.embedding.len()
            ));
        }
        if post.engagement_score < 0.0 || post.engagement_score.is_nan() {
            report.errors.push(format!(
                "post {}: invalid engagement score {}",
                post.id, post.engagement_score
            ));
        }
        if post.engagement_score > SUSPICIOUS_ENGAGEMENT {
            report.warnings.push(format!(
                "post {}: suspiciously high engagement score {}",
                post.id, post.engagement_score
            ));
        }
        if post.cleaned_text.is_empty() {
            report.missing_text += 1;
        }
    }

    report
}

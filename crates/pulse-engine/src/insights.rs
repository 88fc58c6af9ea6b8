//! Quartile-based insight classification over a ranked result set.
//!
//! Pure functions of their input: no store, no embedder, fully
//! unit-testable. Per-query output is deterministic — identical input
//! produces an identical bundle.

use std::collections::HashMap;

use pulse_core::{EngagementMetrics, InsightBundle, SimilarityResult, TopicScore};

/// Number of topics reported per bundle.
const TOP_TOPICS: usize = 5;

/// Minimum token length considered a topic word.
const MIN_TOKEN_LEN: usize = 4;

/// Common English words excluded from topic extraction.
const STOPWORDS: &[&str] = &[
    "this", "that", "with", "have", "from", "your", "they", "their", "there", "what", "when",
    "where", "which", "will", "would", "been", "also",
];

/// Partition a ranked result set into high-value / content-gap buckets using
/// engagement quartiles, and extract the top topics.
///
/// Empty input is a defined terminal case: all sequences empty, all metrics
/// `0.0`. Otherwise a result is high-value iff its engagement score is at or
/// above the 75th percentile, a content gap iff at or below the 25th — with
/// high-value taking precedence when both hold. Results strictly between the
/// thresholds land in neither bucket. Buckets are re-sorted by similarity
/// descending and truncated to `top_k`.
#[must_use]
pub fn classify(results: &[SimilarityResult], top_k: usize) -> InsightBundle {
    if results.is_empty() {
        return InsightBundle::empty();
    }

    let scores: Vec<f32> = results.iter().map(|r| r.engagement_score).collect();
    #[allow(clippy::cast_precision_loss)]
    let avg = scores.iter().sum::<f32>() / scores.len() as f32;
    let max = scores.iter().copied().fold(f32::MIN, f32::max);

    let mut sorted = scores;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let high_threshold = percentile(&sorted, 75.0);
    let low_threshold = percentile(&sorted, 25.0);

    let mut high_value: Vec<SimilarityResult> = Vec::new();
    let mut content_gaps: Vec<SimilarityResult> = Vec::new();
    for result in results {
        if result.engagement_score >= high_threshold {
            high_value.push(result.clone());
        } else if result.engagement_score <= low_threshold {
            content_gaps.push(result.clone());
        }
    }

    sort_by_similarity(&mut high_value);
    sort_by_similarity(&mut content_gaps);
    high_value.truncate(top_k);
    content_gaps.truncate(top_k);

    InsightBundle {
        high_value_content: high_value,
        content_gaps,
        top_topics: extract_top_topics(results, TOP_TOPICS),
        engagement_metrics: EngagementMetrics {
            avg_engagement: avg,
            max_engagement: max,
            high_engagement_threshold: high_threshold,
            low_engagement_threshold: low_threshold,
        },
    }
}

/// Percentile of a sorted slice with linear interpolation between ranks:
/// for percentile `p` over `n` values, interpolate at position
/// `p/100 * (n-1)`.
fn percentile(sorted: &[f32], p: f32) -> f32 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    #[allow(clippy::cast_precision_loss)]
    let rank = p / 100.0 * (sorted.len() - 1) as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - rank.floor();
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn sort_by_similarity(results: &mut [SimilarityResult]) {
    // Stable: ties keep their input (similarity-ranked) order.
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Frequency-heuristic topic extraction over the cleaned text of every
/// result: lowercase word tokens of length >= 4, minus stopwords and purely
/// numeric tokens, counted across the whole set. The top `top_n` tokens are
/// reported with `score = count / max_count`; frequency ties break by
/// first-encountered order.
fn extract_top_topics(results: &[SimilarityResult], top_n: usize) -> Vec<TopicScore> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for result in results {
        for token in tokenize(&result.cleaned_text) {
            if token.chars().count() < MIN_TOKEN_LEN
                || STOPWORDS.contains(&token.as_str())
                || token.chars().all(|c| c.is_ascii_digit())
            {
                continue;
            }
            match counts.get_mut(&token) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(token.clone(), 1);
                    order.push(token);
                }
            }
        }
    }

    if order.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|token| {
            let count = counts[&token];
            (token, count)
        })
        .collect();
    // Stable sort: equal counts stay in first-encountered order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let max_count = ranked[0].1;
    ranked
        .into_iter()
        .take(top_n)
        .map(|(topic, count)| TopicScore {
            topic,
            #[allow(clippy::cast_precision_loss)]
            score: count as f32 / max_count as f32,
        })
        .collect()
}

/// Lowercase word tokens: maximal runs of alphanumeric/underscore characters.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

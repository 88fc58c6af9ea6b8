//! Text cleaning, engagement scoring, source classification, and the
//! normalized content hash used for in-batch deduplication.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use pulse_core::SourceType;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("valid URL regex"));
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex"));
static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?]").expect("valid symbol regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Content phrases that mark a post as written by a reviewer/influencer.
const REVIEWER_INDICATORS: &[&str] = &[
    "review",
    "impression",
    "hands on",
    "unboxing",
    "test",
    "vs",
    "comparison",
];

/// Clean raw post text for embedding: strip URLs, decode HTML entities,
/// drop non-text symbols (keeping basic sentence punctuation), and collapse
/// whitespace. Case is preserved — downstream classification may be
/// case-sensitive. An empty result is valid.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let text = URL_RE.replace_all(raw, "");
    let text = decode_entities(&text);
    let text = SYMBOL_RE.replace_all(&text, "");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Decode the HTML entities that show up in harvested posts: the common
/// named ones plus numeric references. Unknown entities are left as-is.
fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            if let Some(num) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return decode_codepoint(num, 16);
            }
            if let Some(num) = body.strip_prefix('#') {
                return decode_codepoint(num, 10);
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn decode_codepoint(digits: &str, radix: u32) -> String {
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .map_or_else(String::new, |c| c.to_string())
}

/// Weighted engagement score: `0.2*likes + 0.3*shares + 0.5*comments`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_score(likes: i64, shares: i64, comments: i64) -> f32 {
    0.2 * likes as f32 + 0.3 * shares as f32 + 0.5 * comments as f32
}

/// Classify who authored a post.
///
/// Priority order: a competitor keyword in the author handle wins, then a
/// reviewer indicator phrase in the content, else `Customer`. Matching is
/// case-insensitive substring matching — a deliberate frequency heuristic,
/// same as the engagement-quartile insight buckets downstream.
#[must_use]
pub fn classify_source(author: &str, content: &str, competitor_keywords: &[String]) -> SourceType {
    let author_lower = author.to_lowercase();
    let content_lower = content.to_lowercase();

    if competitor_keywords
        .iter()
        .any(|kw| author_lower.contains(kw.as_str()))
    {
        return SourceType::Competitor;
    }

    if REVIEWER_INDICATORS
        .iter()
        .any(|indicator| content_lower.contains(indicator))
    {
        return SourceType::Reviewer;
    }

    SourceType::Customer
}

/// Normalized content hash for in-batch deduplication: SHA-256 of the raw
/// text lowercased and whitespace-trimmed, hex-encoded.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let normalized = text.to_lowercase();
    let hash = Sha256::digest(normalized.trim().as_bytes());
    format!("{hash:x}")
}

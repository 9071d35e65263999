//! Machine-name detection in free-text queries.
//!
//! Names and queries are normalized (hyphen → space, lowercase). An exact
//! whole-word hit wins outright; otherwise fuzzy and plural candidates are
//! pooled.

use crate::fuzz::{partial_ratio, token_set_ratio};
use crate::types::{DetectionResult, EntityManifest, MatchTier};
use regex::Regex;

/// Fuzzy scores must exceed this to count as a match.
pub const FUZZY_THRESHOLD: u8 = 70;

/// Hyphen-insensitive, case-insensitive form of a name or query.
pub fn normalize(text: &str) -> String {
    text.replace('-', " ").to_lowercase()
}

struct Candidate {
    name: String,
    normalized: String,
    exact: Option<Regex>,
}

/// Detects which known machines a query mentions.
pub struct EntityDetector {
    candidates: Vec<Candidate>,
}

impl EntityDetector {
    /// Build a detector over the given machine names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates = names
            .into_iter()
            .map(Into::into)
            .map(|name| {
                let normalized = normalize(&name);
                let exact = Regex::new(&format!(r"\b{}\b", regex::escape(&normalized)))
                    .map_err(|e| tracing::warn!("No exact matcher for '{}': {}", name, e))
                    .ok();
                Candidate {
                    name,
                    normalized,
                    exact,
                }
            })
            .collect();

        Self { candidates }
    }

    /// Detector over a validated manifest.
    pub fn from_manifest(manifest: &EntityManifest) -> Self {
        Self::new(manifest.names().iter().cloned())
    }

    /// Detect machines referenced by `query`.
    pub fn detect(&self, query: &str) -> DetectionResult {
        let query = normalize(query);

        let exact: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| c.exact.as_ref().is_some_and(|re| re.is_match(&query)))
            .map(|c| c.name.clone())
            .collect();

        if !exact.is_empty() {
            tracing::debug!("Exact machine match: {:?}", exact);
            return DetectionResult::new(exact, MatchTier::Exact);
        }

        let approximate: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| fuzzy_match(&c.normalized, &query) || plural_match(&c.normalized, &query))
            .map(|c| c.name.clone())
            .collect();

        if !approximate.is_empty() {
            tracing::debug!("Approximate machine match: {:?}", approximate);
        }
        DetectionResult::new(approximate, MatchTier::Approximate)
    }
}

/// Best of partial and token-set scores, strictly above the threshold.
pub fn fuzzy_match(normalized_name: &str, normalized_query: &str) -> bool {
    let score = partial_ratio(normalized_name, normalized_query)
        .max(token_set_ratio(normalized_name, normalized_query));
    score > FUZZY_THRESHOLD
}

/// Names ending in a single `i` match when `<name>s` occurs in the query.
pub fn plural_match(normalized_name: &str, normalized_query: &str) -> bool {
    normalized_name.ends_with('i')
        && !normalized_name.ends_with("ii")
        && normalized_query.contains(&format!("{}s", normalized_name))
}

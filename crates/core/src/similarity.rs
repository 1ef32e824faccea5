//! Title similarity: decides whether two names refer to the same podcast.
//!
//! Both sides are NFKC-normalized, lowercased and trimmed, then compared with
//! the Sørensen–Dice coefficient over character bigrams (whitespace ignored).
//! An empty side never matches, not even another empty side.

use unicode_normalization::UnicodeNormalization;

use crate::error::ConfigError;

/// Threshold used when the config does not set one.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Similarity score in `0.0..=1.0`. Returns 0.0 when either side is blank.
pub fn score(a: &str, b: &str) -> f64 {
    let a = fold(a);
    let b = fold(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(&a, &b)
}

/// True iff `score(a, b) >= threshold` and neither side is blank.
pub fn similar(a: &str, b: &str, threshold: f64) -> bool {
    let a = fold(a);
    let b = fold(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    strsim::sorensen_dice(&a, &b) >= threshold
}

fn fold(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase().trim().to_string()
}

/// A validated threshold, shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    threshold: f64,
}

impl SimilarityScorer {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn matches(&self, query: &str, candidate: &str) -> bool {
        similar(query, candidate, self.threshold)
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

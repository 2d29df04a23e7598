//! Suffix target normalization and matching.

use std::fmt;

/// Suffix used when the caller supplies none.
pub const DEFAULT_SUFFIX: &str = "pump";

/// Longest suffix accepted; longer input is truncated.
pub const MAX_SUFFIX_LEN: usize = 8;

/// Effective alphabet size per character under case-insensitive base-58 matching.
const EFFECTIVE_ALPHABET: u64 = 29;

/// Returns true if `identifier` ends with `suffix`, ignoring ASCII case.
///
/// Oversized suffixes are not an error; they simply never match.
#[inline]
pub fn matches(identifier: &str, suffix: &str) -> bool {
    identifier.to_lowercase().ends_with(&suffix.to_lowercase())
}

/// A normalized suffix: lowercase, at most [`MAX_SUFFIX_LEN`] characters, never empty.
///
/// Doubles as the pool partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuffixTarget(String);

impl SuffixTarget {
    /// Normalizes raw caller input with the built-in default and length cap.
    pub fn normalize(raw: Option<&str>) -> Self {
        Self::normalize_with(raw, DEFAULT_SUFFIX, MAX_SUFFIX_LEN)
    }

    /// Normalizes raw caller input: trim, lowercase, truncate, fall back to `default`.
    pub fn normalize_with(raw: Option<&str>, default: &str, max_len: usize) -> Self {
        let cut = |s: &str| -> String { s.trim().to_lowercase().chars().take(max_len).collect() };

        let normalized = raw.map(cut).unwrap_or_default();
        if normalized.is_empty() {
            Self(cut(default))
        } else {
            Self(normalized)
        }
    }

    /// Returns the normalized suffix.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tests a candidate identifier against this suffix.
    #[inline]
    pub fn matches(&self, identifier: &str) -> bool {
        // The target is already lowercase, skip re-normalizing it on the hot path.
        let suffix_len = self.0.len();
        identifier.len() >= suffix_len
            && identifier.is_char_boundary(identifier.len() - suffix_len)
            && identifier[identifier.len() - suffix_len..].eq_ignore_ascii_case(&self.0)
    }

    /// Returns the expected number of attempts to find a match.
    ///
    /// Case-insensitive base-58 leaves roughly 29 distinct characters per
    /// position, so expected attempts = 29^n.
    pub fn estimated_attempts(&self) -> u64 {
        EFFECTIVE_ALPHABET.saturating_pow(self.0.chars().count() as u32)
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        match self.estimated_attempts() {
            0..=1_000 => "Very Easy (< 1 second)".into(),
            1_001..=1_000_000 => "Easy (seconds)".into(),
            1_000_001..=100_000_000 => "Medium (minutes)".into(),
            100_000_001..=10_000_000_000 => "Hard (hours)".into(),
            _ => "Very Hard (days or more)".into(),
        }
    }
}

impl Default for SuffixTarget {
    fn default() -> Self {
        Self(DEFAULT_SUFFIX.to_string())
    }
}

impl fmt::Display for SuffixTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SuffixTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

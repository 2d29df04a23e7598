//! Suffix matching for base-58 public identifiers.
//!
//! Matching is case-insensitive and anchored at the end of the identifier.

mod suffix;

pub use suffix::{matches, SuffixTarget, DEFAULT_SUFFIX, MAX_SUFFIX_LEN};

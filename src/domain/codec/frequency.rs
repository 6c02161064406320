//! Character frequency analysis for a single message.
//!
//! Characters are Unicode scalar values (`char`), so multi-byte UTF-8
//! sequences count once per code point.

use crate::domain::CodecError;
use std::collections::BTreeMap;

/// Occurrence count per distinct character. Counts are always >= 1.
///
/// Backed by a `BTreeMap` so iteration order (and therefore tree shape) is
/// independent of hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<char, u64>,
}

impl FrequencyTable {
    /// Count every character of `text`.
    ///
    /// # Errors
    /// Returns `CodecError::EmptyInput` for an empty message.
    pub fn analyze(text: &str) -> Result<Self, CodecError> {
        if text.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        let mut counts = BTreeMap::new();
        for ch in text.chars() {
            *counts.entry(ch).or_insert(0u64) += 1;
        }
        Ok(Self { counts })
    }

    pub fn get(&self, symbol: char) -> Option<u64> {
        self.counts.get(&symbol).copied()
    }

    /// Number of distinct characters.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts; equals the analyzed text's length in chars.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in ascending character order.
    pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        self.counts.iter().map(|(&c, &n)| (c, n))
    }
}

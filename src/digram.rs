//! Digram counting and substitution over symbol sequences.

use crate::symbol::{RuleId, Symbol};
use ahash::AHashMap;
use std::hash::Hash;

/// Counts adjacent pairs in `seq`.
///
/// Occurrences may overlap: in `a a a` the digram `(a, a)` counts twice.
/// Non-overlapping replacement happens later, in [`replace_all`].
pub(crate) fn digram_counts<T: Hash + Eq + Clone>(
    seq: &[Symbol<T>],
) -> AHashMap<(Symbol<T>, Symbol<T>), usize> {
    let mut counts = AHashMap::with_capacity(seq.len().saturating_sub(1));
    for pair in seq.windows(2) {
        *counts
            .entry((pair[0].clone(), pair[1].clone()))
            .or_insert(0) += 1;
    }
    counts
}

/// Picks the digram with the highest count.
///
/// Ties break to the pair whose first occurrence in `seq` is leftmost:
/// the sequence is scanned left to right and the first pair reaching the
/// maximum count wins, which keeps selection deterministic.
pub(crate) fn most_frequent<T: Hash + Eq + Clone>(
    seq: &[Symbol<T>],
    counts: &AHashMap<(Symbol<T>, Symbol<T>), usize>,
) -> Option<((Symbol<T>, Symbol<T>), usize)> {
    let max = counts.values().copied().max()?;
    for pair in seq.windows(2) {
        let key = (pair[0].clone(), pair[1].clone());
        if counts.get(&key) == Some(&max) {
            return Some((key, max));
        }
    }
    None
}

/// Replaces all non-overlapping occurrences of `digram` with `lhs`.
///
/// Single left-to-right scan: on a match, emit `lhs` and advance by two,
/// otherwise emit the current symbol and advance by one. For `a a a` and
/// digram `(a, a)` this yields `[lhs, a]` (leftmost-greedy).
pub(crate) fn replace_all<T: Hash + Eq + Clone>(
    seq: &[Symbol<T>],
    digram: &(Symbol<T>, Symbol<T>),
    lhs: RuleId,
) -> Vec<Symbol<T>> {
    let mut out = Vec::with_capacity(seq.len());
    let mut i = 0;
    while i < seq.len() {
        if i + 1 < seq.len() && seq[i] == digram.0 && seq[i + 1] == digram.1 {
            out.push(Symbol::Rule(lhs));
            i += 2;
        } else {
            out.push(seq[i].clone());
            i += 1;
        }
    }
    out
}

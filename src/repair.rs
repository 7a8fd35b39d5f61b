//! RePair grammar induction.
//!
//! RePair is a greedy grammar-based compression scheme that repeatedly
//! replaces the most frequent pair of adjacent symbols with a fresh
//! non-terminal. This implementation recounts digrams after every
//! substitution and rebuilds the sequence with a linear scan, which keeps
//! the algorithm easy to reason about and lets [`compress_trace`] capture
//! an exact snapshot of the grammar after each step.
//!
//! After the main loop, rule utility is enforced: any rule referenced at
//! most once (across the compressed sequence and all other rule bodies)
//! is inlined away, so every surviving rule is used at least twice.
//!
//! # Example
//!
//! ```
//! use emergence_rs::repair;
//!
//! let tokens: Vec<char> = "abababab".chars().collect();
//! let (compressed, grammar) = repair::compress(&tokens);
//!
//! // Reconstructs the original sequence
//! assert_eq!(repair::reconstruct(&compressed, &grammar), tokens);
//! assert!(compressed.len() < tokens.len());
//! ```

use crate::digram;
use crate::grammar::Grammar;
use crate::symbol::{RuleId, Symbol};
use ahash::AHashMap;
use log::debug;
use std::hash::Hash;

/// State of the induction after a single substitution step.
///
/// Snapshots own their data outright, so mutating one snapshot can never
/// affect another. Intermediate snapshots are taken before singleton
/// inlining; only the final snapshot of a trace is post-inlining.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub compressed: Vec<Symbol<T>>,
    pub grammar: Grammar<T>,
}

impl<T: Hash + Eq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed && self.grammar == other.grammar
    }
}

/// Compresses `tokens` into a grammar and a top-level sequence.
///
/// Repeatedly substitutes the most frequent digram (ties break leftmost)
/// until no pair occurs at least twice, then inlines single-use rules and
/// recomputes rule usage counts and probabilities.
pub fn compress<T: Hash + Eq + Clone>(tokens: &[T]) -> (Vec<Symbol<T>>, Grammar<T>) {
    let mut seq: Vec<Symbol<T>> = tokens.iter().cloned().map(Symbol::Terminal).collect();
    let mut grammar = Grammar::new();
    let mut next_id = 1u32;

    loop {
        if !substitute_best(&mut seq, &mut grammar, &mut next_id) {
            break;
        }
    }

    inline_singletons(&mut seq, &mut grammar);
    update_rule_usage(&seq, &mut grammar);

    debug!(
        "repair: {} tokens -> {} symbols, {} rules",
        tokens.len(),
        seq.len(),
        grammar.len()
    );
    (seq, grammar)
}

/// Runs RePair and records a snapshot after every substitution.
///
/// Usage counts are updated before each snapshot so entropy and MDL can
/// be measured per step. Singleton inlining is applied only once, before
/// the final snapshot; intermediate snapshots keep the full rule set so
/// the rule count grows monotonically along the trace.
pub fn compress_trace<T: Hash + Eq + Clone>(tokens: &[T]) -> Vec<Snapshot<T>> {
    let mut seq: Vec<Symbol<T>> = tokens.iter().cloned().map(Symbol::Terminal).collect();
    let mut grammar = Grammar::new();
    let mut next_id = 1u32;
    let mut snapshots = Vec::new();

    loop {
        if !substitute_best(&mut seq, &mut grammar, &mut next_id) {
            break;
        }
        update_rule_usage(&seq, &mut grammar);
        snapshots.push(Snapshot {
            compressed: seq.clone(),
            grammar: grammar.clone(),
        });
    }

    inline_singletons(&mut seq, &mut grammar);
    update_rule_usage(&seq, &mut grammar);
    snapshots.push(Snapshot {
        compressed: seq,
        grammar,
    });
    snapshots
}

/// Performs one substitution step. Returns false when induction is done.
fn substitute_best<T: Hash + Eq + Clone>(
    seq: &mut Vec<Symbol<T>>,
    grammar: &mut Grammar<T>,
    next_id: &mut u32,
) -> bool {
    let counts = digram::digram_counts(seq);
    let Some((pair, freq)) = digram::most_frequent(seq, &counts) else {
        return false;
    };
    if freq < 2 {
        return false;
    }

    let lhs = RuleId::new(*next_id);
    *next_id += 1;
    grammar.add_rule(lhs, vec![pair.0.clone(), pair.1.clone()]);
    *seq = digram::replace_all(seq, &pair, lhs);
    true
}

/// Expands `compressed` back into the original token sequence.
///
/// Rule references are expanded recursively until only terminals remain.
/// For grammars produced by [`compress`] this is exact: the result equals
/// the token sequence the grammar was induced from.
pub fn reconstruct<T: Hash + Eq + Clone>(
    compressed: &[Symbol<T>],
    grammar: &Grammar<T>,
) -> Vec<T> {
    let mut out = Vec::new();
    for sym in compressed {
        expand_into(sym, grammar, &mut out);
    }
    out
}

fn expand_into<T: Hash + Eq + Clone>(sym: &Symbol<T>, grammar: &Grammar<T>, out: &mut Vec<T>) {
    match sym {
        Symbol::Terminal(value) => out.push(value.clone()),
        Symbol::Rule(id) => {
            let Some(rule) = grammar.rule(*id) else {
                debug_assert!(false, "dangling rule reference {id}");
                return;
            };
            for s in &rule.rhs {
                expand_into(s, grammar, out);
            }
        }
    }
}

/// Fraction of reconstructed tokens that come from rule expansions.
///
/// 0.0 when the reconstruction is empty.
pub fn coverage<T: Hash + Eq + Clone>(compressed: &[Symbol<T>], grammar: &Grammar<T>) -> f64 {
    let mut covered = 0usize;
    let mut total = 0usize;
    for sym in compressed {
        let expanded = expanded_len(sym, grammar);
        total += expanded;
        if sym.is_rule() {
            covered += expanded;
        }
    }
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

fn expanded_len<T: Hash + Eq + Clone>(sym: &Symbol<T>, grammar: &Grammar<T>) -> usize {
    match sym {
        Symbol::Terminal(_) => 1,
        Symbol::Rule(id) => grammar
            .rule(*id)
            .map(|rule| rule.rhs.iter().map(|s| expanded_len(s, grammar)).sum())
            .unwrap_or(0),
    }
}

/// Counts references to each rule LHS in the sequence and across all
/// rule bodies.
fn rule_usage<T: Hash + Eq + Clone>(
    seq: &[Symbol<T>],
    grammar: &Grammar<T>,
) -> AHashMap<RuleId, usize> {
    let mut usage = AHashMap::new();
    for sym in seq {
        if let Some(id) = sym.rule_id() {
            *usage.entry(id).or_insert(0) += 1;
        }
    }
    for rule in grammar.rules().values() {
        for sym in &rule.rhs {
            if let Some(id) = sym.rule_id() {
                *usage.entry(id).or_insert(0) += 1;
            }
        }
    }
    usage
}

/// Enforces rule utility: inlines every rule with external usage <= 1.
///
/// Usage is sampled once per pass and rules are visited in creation
/// order; passes repeat until a fixpoint.
fn inline_singletons<T: Hash + Eq + Clone>(seq: &mut Vec<Symbol<T>>, grammar: &mut Grammar<T>) {
    let mut changed = true;
    while changed && !grammar.is_empty() {
        changed = false;
        let usage = rule_usage(seq, grammar);
        for lhs in grammar.rule_ids() {
            if usage.get(&lhs).copied().unwrap_or(0) > 1 {
                continue;
            }
            let Some(rule) = grammar.remove_rule(lhs) else {
                continue;
            };
            let rhs = rule.rhs;

            // At most one occurrence exists in the sequence.
            if let Some(pos) = seq.iter().position(|s| s.rule_id() == Some(lhs)) {
                seq.splice(pos..pos + 1, rhs.iter().cloned());
                changed = true;
            }

            for other in grammar.rules_mut() {
                if other.rhs.iter().all(|s| s.rule_id() != Some(lhs)) {
                    continue;
                }
                let mut expanded = Vec::with_capacity(other.rhs.len() + rhs.len());
                for sym in &other.rhs {
                    if sym.rule_id() == Some(lhs) {
                        expanded.extend(rhs.iter().cloned());
                    } else {
                        expanded.push(sym.clone());
                    }
                }
                other.rhs = expanded;
                changed = true;
            }
        }
    }
}

/// Recomputes `frequency` (external usage) and `probability` for every
/// rule. Probabilities are zero when the total usage is zero.
fn update_rule_usage<T: Hash + Eq + Clone>(seq: &[Symbol<T>], grammar: &mut Grammar<T>) {
    let usage = rule_usage(seq, grammar);
    for rule in grammar.rules_mut() {
        rule.frequency = usage.get(&rule.lhs).copied().unwrap_or(0);
    }
    let total: usize = grammar.rules().values().map(|r| r.frequency).sum();
    if total == 0 {
        for rule in grammar.rules_mut() {
            rule.probability = 0.0;
        }
    } else {
        let total = total as f64;
        for rule in grammar.rules_mut() {
            rule.probability = rule.frequency as f64 / total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn r(id: u32) -> RuleId {
        RuleId::new(id)
    }

    #[test]
    fn test_single_digram() {
        let tokens = chars("ababab");
        let (compressed, grammar) = compress(&tokens);

        assert_eq!(
            compressed,
            vec![Symbol::Rule(r(1)), Symbol::Rule(r(1)), Symbol::Rule(r(1))]
        );
        assert_eq!(grammar.len(), 1);
        assert_eq!(
            grammar.rule(r(1)).unwrap().rhs,
            vec![Symbol::Terminal('a'), Symbol::Terminal('b')]
        );
        assert_eq!(grammar.rule(r(1)).unwrap().frequency, 3);
        assert_eq!(grammar.rule(r(1)).unwrap().probability, 1.0);
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }

    #[test]
    fn test_nested_rules() {
        let tokens = chars("ababcababc");
        let (compressed, grammar) = compress(&tokens);

        // R1 -> a b; R2 -> R1 R1 survives only inside R3 -> R2 c, so it
        // is inlined and R3 keeps the expanded body.
        assert_eq!(compressed, vec![Symbol::Rule(r(3)), Symbol::Rule(r(3))]);
        assert_eq!(grammar.len(), 2);
        assert_eq!(
            grammar.rule(r(3)).unwrap().rhs,
            vec![
                Symbol::Rule(r(1)),
                Symbol::Rule(r(1)),
                Symbol::Terminal('c')
            ]
        );
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }

    #[test]
    fn test_no_repetition() {
        let tokens = chars("abcd");
        let (compressed, grammar) = compress(&tokens);

        assert!(grammar.is_empty());
        assert_eq!(
            compressed,
            tokens.iter().cloned().map(Symbol::Terminal).collect::<Vec<_>>()
        );
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }

    #[test]
    fn test_empty_input() {
        let tokens: Vec<char> = Vec::new();
        let (compressed, grammar) = compress(&tokens);

        assert!(compressed.is_empty());
        assert!(grammar.is_empty());
        assert!(reconstruct(&compressed, &grammar).is_empty());
    }

    #[test]
    fn test_all_same_symbol() {
        let tokens = chars("aaaa");
        let (compressed, grammar) = compress(&tokens);

        assert_eq!(compressed, vec![Symbol::Rule(r(1)), Symbol::Rule(r(1))]);
        assert_eq!(grammar.len(), 1);
        assert_eq!(grammar.rule(r(1)).unwrap().frequency, 2);
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }

    #[test]
    fn test_singleton_rule_is_inlined_back() {
        // (a,a) occurs twice (overlapping), so R1 -> a a is created, but
        // it ends up used once and rule utility removes it again.
        let tokens = chars("aaa");
        let (compressed, grammar) = compress(&tokens);

        assert!(grammar.is_empty());
        assert_eq!(
            compressed,
            vec![
                Symbol::Terminal('a'),
                Symbol::Terminal('a'),
                Symbol::Terminal('a')
            ]
        );
    }

    #[test]
    fn test_rule_utility_after_compress() {
        let tokens = chars("abcabcabcabcxyxyxy");
        let (compressed, grammar) = compress(&tokens);

        let usage = rule_usage(&compressed, &grammar);
        for (lhs, rule) in grammar.rules() {
            let external = usage.get(lhs).copied().unwrap_or(0);
            assert!(external >= 2, "rule {lhs} has external usage {external}");
            assert_eq!(rule.frequency, external);
        }
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }

    #[test]
    fn test_coverage_full_and_zero() {
        let (compressed, grammar) = compress(&chars("ababab"));
        assert_eq!(coverage(&compressed, &grammar), 1.0);

        let (compressed, grammar) = compress(&chars("abcd"));
        assert_eq!(coverage(&compressed, &grammar), 0.0);

        let (compressed, grammar) = compress(&chars(""));
        assert_eq!(coverage(&compressed, &grammar), 0.0);
    }

    #[test]
    fn test_coverage_partial() {
        // R1 -> a b covers 4 of 5 reconstructed tokens.
        let tokens = chars("ababz");
        let (compressed, grammar) = compress(&tokens);

        assert_eq!(compressed.len(), 3);
        assert_eq!(coverage(&compressed, &grammar), 4.0 / 5.0);
    }

    #[test]
    fn test_trace_records_every_substitution() {
        let snapshots = compress_trace(&chars("ababab"));

        // Two substitutions (R1 -> a b, R2 -> R1 R1) plus the final
        // post-inlining snapshot, in which R2 is gone again.
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].grammar.len(), 1);
        assert_eq!(snapshots[1].grammar.len(), 2);
        assert_eq!(snapshots[2].grammar.len(), 1);
        assert_eq!(
            snapshots[2].compressed,
            vec![Symbol::Rule(r(1)), Symbol::Rule(r(1)), Symbol::Rule(r(1))]
        );
    }

    #[test]
    fn test_trace_rule_count_monotone_before_final() {
        let snapshots = compress_trace(&chars("abcabcabcabcabc"));
        for pair in snapshots[..snapshots.len() - 1].windows(2) {
            assert!(pair[1].grammar.len() >= pair[0].grammar.len());
        }
    }

    #[test]
    fn test_trace_snapshots_are_independent() {
        let mut snapshots = compress_trace(&chars("abababab"));
        let first = snapshots[0].clone();

        let extra = r(99);
        snapshots[1]
            .grammar
            .add_rule(extra, vec![Symbol::Terminal('x'), Symbol::Terminal('y')]);
        snapshots[1].compressed.push(Symbol::Rule(extra));

        assert_eq!(snapshots[0], first);
        assert!(!snapshots[0].grammar.contains(extra));
    }

    #[test]
    fn test_trace_on_empty_and_incompressible_input() {
        assert_eq!(compress_trace(&chars("")).len(), 1);

        let snapshots = compress_trace(&chars("abcd"));
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].grammar.is_empty());
        assert_eq!(snapshots[0].compressed.len(), 4);
    }

    #[test]
    fn test_final_trace_snapshot_matches_compress() {
        let tokens = chars("abcabcababab");
        let (compressed, grammar) = compress(&tokens);
        let snapshots = compress_trace(&tokens);
        let last = snapshots.last().unwrap();

        assert_eq!(last.compressed, compressed);
        assert_eq!(last.grammar, grammar);
    }

    #[test]
    fn test_rhs_references_only_earlier_rules() {
        let (_, grammar) = compress(&chars("abcabcabcabcxyxyxyxyabab"));
        for (lhs, rule) in grammar.rules() {
            for sym in &rule.rhs {
                if let Some(id) = sym.rule_id() {
                    assert!(id < *lhs, "rule {lhs} references later rule {id}");
                }
            }
        }
    }

    #[test]
    fn test_works_with_non_char_tokens() {
        let tokens: Vec<String> = ["fn", "main", "fn", "main", "fn", "main"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (compressed, grammar) = compress(&tokens);

        assert_eq!(grammar.len(), 1);
        assert_eq!(compressed.len(), 3);
        assert_eq!(reconstruct(&compressed, &grammar), tokens);
    }
}

use crate::symbol::{RuleId, Symbol};
use ahash::AHashSet;
use std::collections::BTreeMap;
use std::hash::Hash;

/// A single production `lhs → rhs`.
///
/// `frequency` counts external references to `lhs`: occurrences in the
/// compressed top-level sequence plus occurrences across the right-hand
/// sides of other rules. `probability` is the frequency normalized over
/// all rules (zero when the total is zero).
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRule<T> {
    pub lhs: RuleId,
    pub rhs: Vec<Symbol<T>>,
    pub frequency: usize,
    pub probability: f64,
}

/// A context-free grammar induced over an opaque token alphabet.
///
/// The rule table is keyed by [`RuleId`] in a `BTreeMap`, so every walk
/// over the rules happens in creation order and downstream float
/// accumulation (entropy, MDL) is reproducible bit-for-bit. The
/// compressed top-level sequence plays the role of the start production;
/// right-hand sides hold id references, never pointers, which keeps
/// clones cheap and snapshots structural.
#[derive(Debug, Clone)]
pub struct Grammar<T> {
    rules: BTreeMap<RuleId, ProductionRule<T>>,
    terminals: AHashSet<T>,
}

impl<T: Hash + Eq> PartialEq for Grammar<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules && self.terminals == other.terminals
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Creates an empty grammar.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            terminals: AHashSet::new(),
        }
    }

    /// Adds a rule `lhs → rhs`, interning any terminal values in `rhs`.
    ///
    /// An existing rule with the same LHS is overwritten. The new rule
    /// starts with frequency 0; usage is recomputed by the inducer.
    pub fn add_rule(&mut self, lhs: RuleId, rhs: Vec<Symbol<T>>) -> &mut ProductionRule<T> {
        debug_assert!(rhs.len() >= 2, "rules are created with at least two RHS symbols");

        for sym in &rhs {
            if let Symbol::Terminal(value) = sym {
                if !self.terminals.contains(value) {
                    self.terminals.insert(value.clone());
                }
            }
        }

        self.rules.insert(
            lhs,
            ProductionRule {
                lhs,
                rhs,
                frequency: 0,
                probability: 0.0,
            },
        );
        self.rules.get_mut(&lhs).expect("rule was just inserted")
    }

    /// Returns the rule for `id`, if present.
    pub fn rule(&self, id: RuleId) -> Option<&ProductionRule<T>> {
        self.rules.get(&id)
    }

    /// Returns true if `id` is a rule LHS in this grammar.
    pub fn contains(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    /// Returns the rule table, ordered by rule id.
    pub fn rules(&self) -> &BTreeMap<RuleId, ProductionRule<T>> {
        &self.rules
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the grammar has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rule ids in ascending (creation) order.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.keys().copied().collect()
    }

    /// Returns the set of terminal values seen in rule bodies.
    pub fn terminals(&self) -> &AHashSet<T> {
        &self.terminals
    }

    /// Snapshot view `lhs → rhs`, deep-copied for comparison and export.
    pub fn as_tuples(&self) -> BTreeMap<RuleId, Vec<Symbol<T>>> {
        self.rules
            .iter()
            .map(|(lhs, rule)| (*lhs, rule.rhs.clone()))
            .collect()
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut ProductionRule<T>> {
        self.rules.get_mut(&id)
    }

    pub(crate) fn rules_mut(&mut self) -> impl Iterator<Item = &mut ProductionRule<T>> {
        self.rules.values_mut()
    }

    pub(crate) fn remove_rule(&mut self, id: RuleId) -> Option<ProductionRule<T>> {
        self.rules.remove(&id)
    }
}

impl<T: Hash + Eq + Clone> Default for Grammar<T> {
    fn default() -> Self {
        Self::new()
    }
}

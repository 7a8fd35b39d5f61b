use std::fmt;

/// Identifier for a non-terminal introduced by the inducer.
///
/// Ids are allocated 1, 2, 3, … in creation order and render as `R1`,
/// `R2`, …. Non-terminals live in their own identifier space, so a rule
/// name can never collide with a terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(transparent))]
pub struct RuleId(u32);

impl RuleId {
    /// Creates a rule id from its numeric index.
    pub fn new(index: u32) -> Self {
        RuleId(index)
    }

    /// Returns the numeric index of this rule id.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Symbol in a grammar or compressed sequence.
///
/// Replaces a terminal/non-terminal class hierarchy with a two-variant
/// enum: either an input token or a reference to a production rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol<T> {
    /// A terminal carrying an actual value from the input alphabet.
    Terminal(T),

    /// A reference to a rule (non-terminal).
    Rule(RuleId),
}

impl<T> Symbol<T> {
    /// Returns true if this symbol references a rule.
    pub fn is_rule(&self) -> bool {
        matches!(self, Symbol::Rule(_))
    }

    /// Returns the referenced rule id, if any.
    pub fn rule_id(&self) -> Option<RuleId> {
        match self {
            Symbol::Rule(id) => Some(*id),
            Symbol::Terminal(_) => None,
        }
    }

    /// Returns the terminal value, if any.
    pub fn terminal(&self) -> Option<&T> {
        match self {
            Symbol::Terminal(v) => Some(v),
            Symbol::Rule(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Symbol<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(v) => v.fmt(f),
            Symbol::Rule(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_id_display() {
        assert_eq!(RuleId::new(1).to_string(), "R1");
        assert_eq!(RuleId::new(12).to_string(), "R12");
    }

    #[test]
    fn test_rule_id_ordering_is_numeric() {
        assert!(RuleId::new(2) < RuleId::new(10));
    }

    #[test]
    fn test_symbol_accessors() {
        let t = Symbol::Terminal('a');
        let r = Symbol::<char>::Rule(RuleId::new(3));

        assert!(!t.is_rule());
        assert_eq!(t.terminal(), Some(&'a'));
        assert_eq!(t.rule_id(), None);

        assert!(r.is_rule());
        assert_eq!(r.rule_id(), Some(RuleId::new(3)));
        assert_eq!(r.terminal(), None);
    }

    #[test]
    fn test_symbol_equality() {
        assert_eq!(Symbol::Terminal(42), Symbol::Terminal(42));
        assert_ne!(Symbol::Terminal(42), Symbol::Terminal(99));
        assert_ne!(Symbol::Terminal(42), Symbol::Rule(RuleId::new(42)));
    }

    #[test]
    fn test_symbol_display() {
        assert_eq!(Symbol::Terminal("ab").to_string(), "ab");
        assert_eq!(Symbol::<char>::Rule(RuleId::new(7)).to_string(), "R7");
    }
}

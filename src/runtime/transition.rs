//! ATN transitions
//!
//! Transitions are a closed set of variants. The epsilon-class variants
//! (`Epsilon`, `Rule`, `Return`, `Predicate`, `Precedence`, `Action`) never
//! match an input symbol; closure follows them. The others consume exactly
//! one symbol.

use super::interval_set::IntervalSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An edge of the ATN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Unconditional epsilon edge
    Epsilon {
        /// Target state
        target: usize,
    },

    /// Match exactly one symbol
    Atom {
        /// Target state
        target: usize,
        /// Symbol to match
        label: i32,
    },

    /// Match any symbol in `from..=to`
    Range {
        /// Target state
        target: usize,
        /// Lowest symbol
        from: i32,
        /// Highest symbol
        to: i32,
    },

    /// Match any symbol in the set
    Set {
        /// Target state
        target: usize,
        /// Accepted symbols
        set: IntervalSet,
    },

    /// Match any symbol in the vocabulary that is not in the set
    NotSet {
        /// Target state
        target: usize,
        /// Rejected symbols
        set: IntervalSet,
    },

    /// Match any symbol in the vocabulary
    Wildcard {
        /// Target state
        target: usize,
    },

    /// Invoke a rule; `target` is the rule's start state
    Rule {
        /// Start state of the invoked rule
        target: usize,
        /// Index of the invoked rule
        rule_index: usize,
        /// Precedence argument for left-recursive rules (0 otherwise)
        precedence: i32,
        /// State to continue at once the invoked rule returns
        follow_state: usize,
    },

    /// Follow link from a rule stop state back to a call site
    ///
    /// Derived by [`Atn::link`](super::graph::Atn::link), one per `Rule`
    /// transition invoking the rule.
    Return {
        /// Follow state of the call site
        target: usize,
    },

    /// Semantic predicate `{...}?`
    Predicate {
        /// Target state
        target: usize,
        /// Rule containing the predicate
        rule_index: usize,
        /// Predicate index within the recognizer
        pred_index: usize,
        /// Whether the predicate reads the invoking rule's context
        ctx_dependent: bool,
    },

    /// Precedence predicate `{precpred(n)}?` of left-recursive rules
    Precedence {
        /// Target state
        target: usize,
        /// Precedence level required
        precedence: i32,
    },

    /// Embedded action; for lexers `action_index` indexes `Atn::lexer_actions`
    Action {
        /// Target state
        target: usize,
        /// Rule containing the action
        rule_index: usize,
        /// Action index
        action_index: usize,
        /// Whether the action reads the invoking rule's context
        ctx_dependent: bool,
    },
}

impl Transition {
    /// Target state of the edge
    #[inline]
    pub fn target(&self) -> usize {
        match self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Rule { target, .. }
            | Transition::Return { target }
            | Transition::Predicate { target, .. }
            | Transition::Precedence { target, .. }
            | Transition::Action { target, .. } => *target,
        }
    }

    /// Whether the edge is traversed without consuming input
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Return { .. }
                | Transition::Predicate { .. }
                | Transition::Precedence { .. }
                | Transition::Action { .. }
        )
    }

    /// Whether the edge consumes `symbol`, given the vocabulary `min..=max`
    #[inline]
    pub fn matches(&self, symbol: i32, min: i32, max: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { from, to, .. } => *from <= symbol && symbol <= *to,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol >= min && symbol <= max && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol >= min && symbol <= max,
            _ => false,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Epsilon { .. } => write!(f, "ε"),
            Transition::Atom { label, .. } => write!(f, "{}", label),
            Transition::Range { from, to, .. } => write!(f, "{}..{}", from, to),
            Transition::Set { set, .. } => write!(f, "{}", set),
            Transition::NotSet { set, .. } => write!(f, "~{}", set),
            Transition::Wildcard { .. } => write!(f, "."),
            Transition::Rule { rule_index, .. } => write!(f, "rule {}", rule_index),
            Transition::Return { .. } => write!(f, "return"),
            Transition::Predicate {
                rule_index,
                pred_index,
                ..
            } => write!(f, "{{{}:{}}}?", rule_index, pred_index),
            Transition::Precedence { precedence, .. } => write!(f, "{{{}>=prec}}?", precedence),
            Transition::Action {
                rule_index,
                action_index,
                ..
            } => write!(f, "action {}:{}", rule_index, action_index),
        }
    }
}

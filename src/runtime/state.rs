//! ATN states

use super::transition::Transition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural role of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Plain state
    Basic,
    /// Entry of a rule
    RuleStart,
    /// Exit of a rule; its transitions are the derived follow links
    RuleStop,
    /// Start of a `( ... | ... )` block
    BlockStart,
    /// Start of the block of a `( ... )+` loop
    PlusBlockStart,
    /// Start of the block of a `( ... )*` loop
    StarBlockStart,
    /// End of any block
    BlockEnd,
    /// Decision at the end of a `+` loop: iterate again or exit
    PlusLoopBack,
    /// Decision in front of a `*` loop: enter or skip
    StarLoopEntry,
    /// Back edge of a `*` loop
    StarLoopBack,
    /// Exit of a loop
    LoopEnd,
    /// Lexer mode entry; one alternative per token rule
    TokensStart,
}

impl StateKind {
    /// Whether states of this kind may carry a decision number
    pub fn is_decision_kind(self) -> bool {
        matches!(
            self,
            StateKind::BlockStart
                | StateKind::PlusBlockStart
                | StateKind::StarBlockStart
                | StateKind::PlusLoopBack
                | StateKind::StarLoopEntry
                | StateKind::TokensStart
        )
    }
}

/// A node of the ATN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtnState {
    /// Position in `Atn::states`
    pub id: usize,
    /// Rule owning the state
    pub rule_index: usize,
    /// Structural role
    pub kind: StateKind,
    /// Outgoing edges; for decision states the order numbers the alternatives
    pub transitions: Vec<Transition>,
    /// True iff there is at least one transition and all are epsilon-class
    #[serde(default)]
    pub epsilon_only: bool,
    /// Decision number, for decision states
    #[serde(default)]
    pub decision: Option<usize>,
    /// Non-greedy loop or optional block
    #[serde(default)]
    pub non_greedy: bool,
}

impl AtnState {
    /// Create a state with no transitions
    pub fn new(id: usize, rule_index: usize, kind: StateKind) -> Self {
        Self {
            id,
            rule_index,
            kind,
            transitions: Vec::new(),
            epsilon_only: false,
            decision: None,
            non_greedy: false,
        }
    }

    /// Append a transition, keeping `epsilon_only` current
    pub fn add_transition(&mut self, transition: Transition) {
        let eps = transition.is_epsilon();
        self.epsilon_only = if self.transitions.is_empty() {
            eps
        } else {
            self.epsilon_only && eps
        };
        self.transitions.push(transition);
    }

    /// Recompute `epsilon_only` from the transitions
    pub(crate) fn refresh_epsilon_only(&mut self) {
        self.epsilon_only =
            !self.transitions.is_empty() && self.transitions.iter().all(|t| t.is_epsilon());
    }

    /// Whether this is a rule stop state
    #[inline]
    pub fn is_rule_stop(&self) -> bool {
        self.kind == StateKind::RuleStop
    }
}

impl fmt::Display for AtnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.id, self.kind)?;
        if let Some(decision) = self.decision {
            write!(f, " d={}", decision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_only_tracking() {
        let mut state = AtnState::new(0, 0, StateKind::Basic);
        assert!(!state.epsilon_only);

        state.add_transition(Transition::Epsilon { target: 1 });
        assert!(state.epsilon_only);

        state.add_transition(Transition::Atom {
            target: 2,
            label: 5,
        });
        assert!(!state.epsilon_only);

        state.transitions.pop();
        state.refresh_epsilon_only();
        assert!(state.epsilon_only);
    }

    #[test]
    fn test_decision_kinds() {
        assert!(StateKind::StarLoopEntry.is_decision_kind());
        assert!(StateKind::TokensStart.is_decision_kind());
        assert!(!StateKind::StarLoopBack.is_decision_kind());
        assert!(!StateKind::RuleStop.is_decision_kind());
    }
}

//! The parser's live rule-invocation stack
//!
//! Prediction receives the caller's stack as a slice of frames, outermost
//! first. Only the invoking states matter to the simulator: each one names
//! the call site whose follow state the rule returns to.

/// One active rule invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleInvocation {
    /// The invoked rule
    pub rule_index: usize,
    /// State holding the `Rule` transition that made the call; `None` for the
    /// start rule
    pub invoking_state: Option<usize>,
    /// Precedence argument the rule was invoked with (0 if not left-recursive)
    pub precedence: i32,
}

impl RuleInvocation {
    /// Frame for the start rule
    pub fn root(rule_index: usize) -> Self {
        Self {
            rule_index,
            invoking_state: None,
            precedence: 0,
        }
    }

    /// Frame for a rule invoked from `invoking_state`
    pub fn invoked(rule_index: usize, invoking_state: usize, precedence: i32) -> Self {
        Self {
            rule_index,
            invoking_state: Some(invoking_state),
            precedence,
        }
    }
}

//! Recognition errors
//!
//! The simulators only *report* error conditions. Recovery (resynchronizing,
//! token insertion/deletion) belongs to the caller.

use std::fmt;

/// Result type for recognition operations
pub type RecognitionResult<T> = Result<T, RecognitionError>;

/// Errors surfaced by the lexer and parser simulators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// No alternative of a parser decision can match the upcoming input
    NoViableAlt {
        /// Decision number being predicted
        decision: usize,
        /// Token index where prediction started
        start_index: usize,
        /// Token index of the symbol no configuration could match
        offending_index: usize,
        /// Type of the offending token
        offending_type: i32,
    },

    /// The lexer could not match any token at the current position
    LexerNoViableAlt {
        /// Lexer mode that was active
        mode: usize,
        /// Character index where the token started
        start_index: usize,
        /// Character index where the simulation stopped
        index: usize,
        /// Line of the token start (1-based)
        line: usize,
        /// Column of the token start (0-based)
        column: usize,
    },

    /// A predicate guarding the only remaining path evaluated to false
    FailedPredicate {
        /// Rule containing the predicate
        rule_index: usize,
        /// Predicate text, e.g. `{0:1}?` or `{3>=prec}?`
        predicate: String,
        /// Token index when the predicate was evaluated
        index: usize,
    },

    /// The parser interpreter expected a different token
    InputMismatch {
        /// State the interpreter was in
        state: usize,
        /// Type of the token found
        found: i32,
        /// Token index of the mismatch
        index: usize,
    },

    /// The automaton graph failed validation
    InvalidAtn {
        /// Reason why the graph is invalid
        reason: String,
    },

    /// A context node handed to the store is malformed
    InvalidContext {
        /// What is wrong with the node
        reason: String,
    },

    /// Closure exceeded the configured depth limit
    ClosureDepthExceeded {
        /// Depth reached
        depth: usize,
        /// Maximum allowed depth
        max_depth: usize,
    },

    /// A single prediction consumed more lookahead than allowed
    StepLimitExceeded {
        /// Decision number being predicted
        decision: usize,
        /// Maximum number of lookahead steps
        max_steps: usize,
    },

    /// `popMode` executed with an empty mode stack
    ModeStackEmpty {
        /// Character index of the token that issued the command
        index: usize,
    },

    /// Internal error (shouldn't happen in normal use)
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl RecognitionError {
    /// Create an `InvalidAtn` error
    pub fn invalid_atn(reason: impl Into<String>) -> Self {
        RecognitionError::InvalidAtn {
            reason: reason.into(),
        }
    }

    /// Create an `InvalidContext` error
    pub fn invalid_context(reason: impl Into<String>) -> Self {
        RecognitionError::InvalidContext {
            reason: reason.into(),
        }
    }

    /// Whether this error is a syntax-level failure (as opposed to a limit or
    /// configuration problem)
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            RecognitionError::NoViableAlt { .. }
                | RecognitionError::LexerNoViableAlt { .. }
                | RecognitionError::FailedPredicate { .. }
                | RecognitionError::InputMismatch { .. }
        )
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionError::NoViableAlt {
                decision,
                start_index,
                offending_index,
                offending_type,
            } => {
                write!(
                    f,
                    "No viable alternative for decision {} at token {} (type {}), prediction started at token {}",
                    decision, offending_index, offending_type, start_index
                )
            }
            RecognitionError::LexerNoViableAlt {
                mode,
                start_index,
                index,
                line,
                column,
            } => {
                write!(
                    f,
                    "Token recognition error at line {}, column {} (chars {}..{}, mode {})",
                    line, column, start_index, index, mode
                )
            }
            RecognitionError::FailedPredicate {
                rule_index,
                predicate,
                index,
            } => {
                write!(
                    f,
                    "Predicate {} failed in rule {} at token {}",
                    predicate, rule_index, index
                )
            }
            RecognitionError::InputMismatch {
                state,
                found,
                index,
            } => {
                write!(
                    f,
                    "Mismatched input at token {} (type {}) in state {}",
                    index, found, state
                )
            }
            RecognitionError::InvalidAtn { reason } => {
                write!(f, "Invalid ATN: {}", reason)
            }
            RecognitionError::InvalidContext { reason } => {
                write!(f, "Invalid context node: {}", reason)
            }
            RecognitionError::ClosureDepthExceeded { depth, max_depth } => {
                write!(
                    f,
                    "Closure depth limit exceeded: depth {} exceeds limit of {}",
                    depth, max_depth
                )
            }
            RecognitionError::StepLimitExceeded {
                decision,
                max_steps,
            } => {
                write!(
                    f,
                    "Prediction step limit exceeded for decision {}: more than {} lookahead symbols",
                    decision, max_steps
                )
            }
            RecognitionError::ModeStackEmpty { index } => {
                write!(f, "popMode with empty mode stack at char {}", index)
            }
            RecognitionError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RecognitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_no_viable_alt() {
        let err = RecognitionError::NoViableAlt {
            decision: 3,
            start_index: 1,
            offending_index: 4,
            offending_type: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("decision 3"));
        assert!(msg.contains("token 4"));
    }

    #[test]
    fn test_syntax_error_classification() {
        assert!(RecognitionError::InputMismatch {
            state: 0,
            found: 1,
            index: 0
        }
        .is_syntax_error());
        assert!(!RecognitionError::invalid_atn("bad").is_syntax_error());
        assert!(!RecognitionError::ClosureDepthExceeded {
            depth: 10,
            max_depth: 5
        }
        .is_syntax_error());
    }
}

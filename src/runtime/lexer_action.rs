//! Lexer commands and their executor
//!
//! Commands (`-> skip`, `-> pushMode(X)`, ...) and custom actions are
//! collected on lexer configurations while the simulation runs and executed
//! only when a token is committed. Custom actions can observe the input
//! position, so an action reached in the middle of a token is recorded as
//! [`LexerAction::Indexed`] with its offset from the token start; replaying
//! it seeks to that offset first. That keeps a cached DFA state valid no
//! matter where in the input it is reused.

use super::error::RecognitionResult;
use super::semantic::NoHooks;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A lexer command
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LexerAction {
    /// `-> channel(n)`
    Channel(i32),
    /// Grammar-specific action `{...}`
    Custom {
        /// Rule containing the action
        rule_index: usize,
        /// Action index
        action_index: usize,
    },
    /// `-> mode(m)`
    Mode(usize),
    /// `-> more`
    More,
    /// `-> popMode`
    PopMode,
    /// `-> pushMode(m)`
    PushMode(usize),
    /// `-> skip`
    Skip,
    /// `-> type(t)`
    Type(i32),
    /// A position-dependent action pinned to an offset from the token start
    Indexed {
        /// Offset from the token start
        offset: usize,
        /// The wrapped action
        action: Box<LexerAction>,
    },
}

impl LexerAction {
    /// Whether executing the action depends on the input position
    pub fn is_position_dependent(&self) -> bool {
        matches!(self, LexerAction::Custom { .. } | LexerAction::Indexed { .. })
    }

    /// Apply the action to `lexer`
    pub fn execute(&self, lexer: &mut dyn LexerControl) -> RecognitionResult<()> {
        match self {
            LexerAction::Channel(channel) => lexer.set_channel(*channel),
            LexerAction::Custom {
                rule_index,
                action_index,
            } => lexer.custom(*rule_index, *action_index),
            LexerAction::Mode(mode) => lexer.set_mode(*mode),
            LexerAction::More => lexer.more(),
            LexerAction::PopMode => return lexer.pop_mode(),
            LexerAction::PushMode(mode) => lexer.push_mode(*mode),
            LexerAction::Skip => lexer.skip(),
            LexerAction::Type(token_type) => lexer.set_type(*token_type),
            LexerAction::Indexed { action, .. } => return action.execute(lexer),
        }
        Ok(())
    }
}

impl fmt::Display for LexerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerAction::Channel(c) => write!(f, "channel({})", c),
            LexerAction::Custom {
                rule_index,
                action_index,
            } => write!(f, "action({}:{})", rule_index, action_index),
            LexerAction::Mode(m) => write!(f, "mode({})", m),
            LexerAction::More => write!(f, "more"),
            LexerAction::PopMode => write!(f, "popMode"),
            LexerAction::PushMode(m) => write!(f, "pushMode({})", m),
            LexerAction::Skip => write!(f, "skip"),
            LexerAction::Type(t) => write!(f, "type({})", t),
            LexerAction::Indexed { offset, action } => write!(f, "{}@{}", action, offset),
        }
    }
}

/// What lexer commands operate on
///
/// Implemented by [`Lexer`](super::lexer::Lexer); kept as a trait so the
/// executor can be tested in isolation.
pub trait LexerControl {
    /// Drop the current token and start a new one
    fn skip(&mut self);
    /// Keep matching; the next match extends the current token
    fn more(&mut self);
    /// Override the token type
    fn set_type(&mut self, token_type: i32);
    /// Override the channel
    fn set_channel(&mut self, channel: i32);
    /// Switch mode
    fn set_mode(&mut self, mode: usize);
    /// Push the current mode and switch
    fn push_mode(&mut self, mode: usize);
    /// Return to the mode on top of the stack
    fn pop_mode(&mut self) -> RecognitionResult<()>;
    /// Run a grammar-specific action
    fn custom(&mut self, rule_index: usize, action_index: usize);
    /// Current input position
    fn index(&self) -> usize;
    /// Move the input cursor
    fn seek(&mut self, index: usize);
}

/// Position information handed to lexer predicates and actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerCursor {
    /// Current character index
    pub index: usize,
    /// Current line (1-based)
    pub line: usize,
    /// Current column (0-based)
    pub column: usize,
    /// Character index where the token started
    pub token_start: usize,
}

/// Callbacks into grammar-specific lexer code
pub trait LexerHooks {
    /// Evaluate predicate `pred_index` of `rule_index`
    fn sempred(&mut self, rule_index: usize, pred_index: usize, cursor: LexerCursor) -> bool {
        let _ = (rule_index, pred_index, cursor);
        true
    }

    /// Run custom action `action_index` of `rule_index`
    fn action(&mut self, rule_index: usize, action_index: usize, cursor: LexerCursor) {
        let _ = (rule_index, action_index, cursor);
    }
}

impl LexerHooks for NoHooks {}

/// The ordered commands collected for one token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexerActionExecutor {
    actions: Arc<[LexerAction]>,
}

impl LexerActionExecutor {
    /// Executor running `actions` in order
    pub fn new(actions: Vec<LexerAction>) -> Self {
        Self {
            actions: actions.into(),
        }
    }

    /// Executor with `action` appended to `existing`
    pub fn append(
        existing: Option<&Arc<LexerActionExecutor>>,
        action: LexerAction,
    ) -> Arc<LexerActionExecutor> {
        let mut actions = existing.map_or_else(Vec::new, |e| e.actions.to_vec());
        actions.push(action);
        Arc::new(Self::new(actions))
    }

    /// The commands, in execution order
    pub fn actions(&self) -> &[LexerAction] {
        &self.actions
    }

    /// Pin every unpinned position-dependent action to `offset`
    ///
    /// Returns `self` unchanged when nothing needs pinning.
    pub fn fix_offset_before_match(self: &Arc<Self>, offset: usize) -> Arc<Self> {
        let needs_fix = self
            .actions
            .iter()
            .any(|a| a.is_position_dependent() && !matches!(a, LexerAction::Indexed { .. }));
        if !needs_fix {
            return Arc::clone(self);
        }
        let actions = self
            .actions
            .iter()
            .map(|a| match a {
                LexerAction::Indexed { .. } => a.clone(),
                a if a.is_position_dependent() => LexerAction::Indexed {
                    offset,
                    action: Box::new(a.clone()),
                },
                a => a.clone(),
            })
            .collect();
        Arc::new(Self::new(actions))
    }

    /// Run the commands against `lexer` for a token starting at `start_index`
    ///
    /// The input cursor is left where it was on entry.
    pub fn execute(&self, lexer: &mut dyn LexerControl, start_index: usize) -> RecognitionResult<()> {
        let stop_index = lexer.index();
        let mut requires_seek = false;
        let mut result = Ok(());
        for action in self.actions.iter() {
            let action = match action {
                LexerAction::Indexed { offset, action } => {
                    let position = start_index + offset;
                    lexer.seek(position);
                    requires_seek = position != stop_index;
                    action.as_ref()
                }
                other if other.is_position_dependent() => {
                    lexer.seek(stop_index);
                    requires_seek = false;
                    other
                }
                other => other,
            };
            if let Err(e) = action.execute(lexer) {
                result = Err(e);
                break;
            }
        }
        if requires_seek {
            lexer.seek(stop_index);
        }
        result
    }
}

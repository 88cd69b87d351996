//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from atnsim.
//! Importing this module with a wildcard import brings the core types into scope:
//!
//! ```
//! use atnsim::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Graph and Builder
//! - [`Atn`] - The automaton graph
//! - [`AtnBuilder`] - Lays out grammars as ATNs
//! - [`tok()`], [`ch()`], [`lit()`], [`seq()`], [`alt()`], [`star()`], ... - Grammar elements
//!
//! ## Recognition
//! - [`Lexer`] / [`LexerAtnSimulator`] - Tokenizing
//! - [`ParserInterpreter`] / [`ParserAtnSimulator`] - Prediction
//! - [`CharStream`] / [`CommonTokenStream`] - Inputs
//!
//! ## Configuration and Errors
//! - [`SimulatorConfig`] - Limits and prediction mode
//! - [`PredictionMode`] - SLL, LL or exact-ambiguity LL
//! - [`RecognitionError`] - Error type

// ============================================================================
// Graph and Builder
// ============================================================================

pub use crate::runtime::builder::{
    action, alt, any, ch, char_range, command, ctx_pred, eof, lit, not_set, opt, opt_lazy, plus,
    plus_lazy, pred, precpred, range, rule, rule_prec, seq, set, star, star_lazy, tok, AtnBuilder,
    Element,
};
pub use crate::runtime::{Atn, AtnKind};

// ============================================================================
// Recognition
// ============================================================================

pub use crate::runtime::{
    CharStream, CommonTokenStream, IntStream, Lexer, LexerAction, LexerAtnSimulator, LexerHooks,
    NoHooks, ParserAtnSimulator, ParserHooks, ParserInterpreter, RuleInvocation, Token,
    TokenStream, EOF,
};

// ============================================================================
// Configuration and Errors
// ============================================================================

pub use crate::runtime::{
    DiagnosticListener, PredictionMode, RecognitionError, RecognitionResult, SimulatorConfig,
};

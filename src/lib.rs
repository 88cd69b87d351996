//! atnsim - ATN simulation runtime
//!
//! The runtime half of an ANTLR-style recognizer: given the augmented
//! transition network a grammar compiles to, it lexes with maximal munch and
//! predicts parser alternatives with adaptive LL(*). It provides:
//! - Hash-consed graph-structured call-stack contexts with merge
//! - Configuration sets with closure, reach and conflict detection
//! - Per-decision DFA caches built lazily and reused across inputs
//! - Lexer simulation with commands, modes and position-pinned actions
//! - SLL prediction with full-LL escalation and ambiguity diagnostics
//! - A builder DSL for grammars and an interpreter that drives prediction
//! - Developer tools (DOT/Mermaid graphs, DFA dumps, traces)
//!
//! ## Quick Start
//!
//! ```rust
//! use atnsim::runtime::builder::*;
//! use atnsim::runtime::{CommonTokenStream, ParserAtnSimulator, NoHooks, RuleInvocation};
//! use std::sync::Arc;
//!
//! // s : 1 1 | 1 2 ;
//! let atn = AtnBuilder::parser(2)
//!     .rule("s", alt(vec![seq(vec![tok(1), tok(1)]), seq(vec![tok(1), tok(2)])]))
//!     .build()
//!     .unwrap();
//! let mut sim = ParserAtnSimulator::new(Arc::new(atn));
//! let mut input = CommonTokenStream::from_types(&[1, 2]);
//! let alt = sim
//!     .adaptive_predict(&mut input, 0, &[RuleInvocation::root(0)], &mut NoHooks)
//!     .unwrap();
//! assert_eq!(alt, 2);
//! ```
//!
//! ## Lexing
//!
//! ```rust
//! use atnsim::prelude::*;
//! use std::sync::Arc;
//!
//! let atn = AtnBuilder::lexer()
//!     .token("A", 1, ch('a'))
//!     .token("AB", 2, lit("ab"))
//!     .build()
//!     .unwrap();
//! let tokens = Lexer::new(Arc::new(atn), "ab").tokenize().unwrap();
//! assert_eq!(tokens[0].token_type, 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

#[macro_use]
mod logging;

// Prelude module for convenient imports
pub mod prelude;

pub mod runtime;

/// Re-export commonly used types for convenience
pub use runtime::{
    Atn, AtnKind, CharStream, CommonTokenStream, ContextId, ContextStore, Lexer,
    LexerAtnSimulator, NoHooks, ParserAtnSimulator, ParserInterpreter, PredictionCache,
    PredictionMode, RecognitionError, RecognitionResult, RuleInvocation, SimulatorConfig, Token,
};

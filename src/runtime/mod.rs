//! ATN simulation runtime
//!
//! An ATN (augmented transition network) is the state graph a grammar tool
//! derives from lexer and parser rules. This module walks it at runtime:
//!
//! ## Graph
//! - [`Atn`] - States, transitions and the decision/rule/mode tables
//! - [`builder`] - DSL for laying out grammars as ATNs
//!
//! ## Prediction Machinery
//! - [`ContextStore`] - Hash-consed graph-structured call stacks
//! - [`ConfigSet`] - Configurations with closure and conflict bookkeeping
//! - [`Dfa`] / [`PredictionCache`] - Per-decision DFAs filled on demand
//!
//! ## Simulators
//! - [`LexerAtnSimulator`] - Maximal munch, earliest rule wins ties
//! - [`ParserAtnSimulator`] - SLL prediction, escalating to full LL on
//!   conflicts
//!
//! ## Drivers
//! - [`Lexer`] - Runs lexer commands and emits [`Token`]s
//! - [`ParserInterpreter`] - Interprets a parser ATN over a token stream
//!
//! ## Diagnostics
//! - [`DiagnosticListener`] - Ambiguity and context-sensitivity reports
//! - [`debug`] - DOT/Mermaid/text renderings

// ============================================================================
// Module Declarations
// ============================================================================

pub mod alt_set;
pub mod builder;
pub mod cache;
pub mod config;
pub mod context;
pub mod debug;
pub mod dfa;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod interval_set;
pub mod lexer;
pub mod lexer_action;
pub mod lexer_sim;
pub mod listener;
pub mod parser_sim;
pub mod prediction_mode;
pub mod rule_context;
pub mod semantic;
pub mod sim_config;
pub mod state;
pub mod stream;
pub mod token;
pub mod transition;

// ============================================================================
// Graph
// ============================================================================

pub use graph::{Atn, AtnKind};
pub use interval_set::IntervalSet;
pub use state::{AtnState, StateKind};
pub use transition::Transition;

// ============================================================================
// Prediction Machinery
// ============================================================================

pub use alt_set::AltSet;
pub use cache::{PredictionCache, SimulatorStats};
pub use config::{AtnConfig, ConfigSet};
pub use context::{ContextId, ContextNode, ContextStore, EMPTY_RETURN_STATE};
pub use dfa::{Dfa, DfaState, DfaStateId, PredPrediction};
pub use prediction_mode::PredictionMode;
pub use semantic::{NoHooks, ParserHooks, SemanticContext};

// ============================================================================
// Simulators
// ============================================================================

pub use lexer_action::{LexerAction, LexerActionExecutor, LexerControl, LexerCursor, LexerHooks};
pub use lexer_sim::{LexerAtnSimulator, LexerMatch};
pub use parser_sim::ParserAtnSimulator;
pub use rule_context::RuleInvocation;
pub use sim_config::SimulatorConfig;

// ============================================================================
// Drivers
// ============================================================================

pub use interpreter::{ParseTrace, ParserInterpreter, TraceEvent};
pub use lexer::Lexer;
pub use stream::{CharStream, CommonTokenStream, IntStream, TokenStream};
pub use token::{Token, DEFAULT_CHANNEL, EOF, HIDDEN_CHANNEL};

// ============================================================================
// Diagnostics and Errors
// ============================================================================

pub use debug::{AtnVisualizer, DfaPrinter, SourceFormatter, TraceFormatter};
pub use error::{RecognitionError, RecognitionResult};
pub use listener::{Diagnostic, DiagnosticListener, LoggingListener, RecordingListener};

//! Grammar interpreter driving the parser simulator
//!
//! Walks the ATN of a parser grammar over a token stream, asking
//! [`ParserAtnSimulator::adaptive_predict`] at every state with more than one
//! outgoing transition. Instead of building a parse tree it records a
//! [`ParseTrace`] of rule entries, decisions and matched tokens, which is
//! what the simulator tests and the benchmarks need.

use super::error::{RecognitionError, RecognitionResult};
use super::graph::{Atn, AtnKind};
use super::listener::DiagnosticListener;
use super::parser_sim::ParserAtnSimulator;
use super::prediction_mode::PredictionMode;
use super::rule_context::RuleInvocation;
use super::semantic::{NoHooks, ParserHooks, SemanticContext};
use super::sim_config::SimulatorConfig;
use super::stream::{CommonTokenStream, IntStream};
use super::token::EOF;
use super::transition::Transition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One step of an interpreted parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// A rule was entered
    EnterRule {
        /// Rule index
        rule_index: usize,
        /// Current token index
        token_index: usize,
    },
    /// A rule returned
    ExitRule {
        /// Rule index
        rule_index: usize,
        /// Current token index
        token_index: usize,
    },
    /// A decision was predicted
    Decision {
        /// Decision number
        decision: usize,
        /// Decision state
        state: usize,
        /// Predicted alternative
        alt: usize,
        /// Token index where prediction started
        token_index: usize,
    },
    /// A token was matched
    Match {
        /// Token type
        token_type: i32,
        /// Token index
        token_index: usize,
    },
}

/// Record of an interpreted parse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTrace {
    /// Events in order
    pub events: Vec<TraceEvent>,
}

impl ParseTrace {
    /// `(decision, alt)` pairs in order
    pub fn decisions(&self) -> Vec<(usize, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Decision { decision, alt, .. } => Some((*decision, *alt)),
                _ => None,
            })
            .collect()
    }

    /// Types of the matched tokens in order
    pub fn matched(&self) -> Vec<i32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Match { token_type, .. } => Some(*token_type),
                _ => None,
            })
            .collect()
    }
}

/// Interpreter for a parser ATN
///
/// # Example
///
/// ```rust
/// use atnsim::runtime::builder::*;
/// use atnsim::runtime::{CommonTokenStream, ParserInterpreter};
/// use std::sync::Arc;
///
/// // s : 1 (2 | 3) EOF ;
/// let atn = AtnBuilder::parser(3)
///     .rule("s", seq(vec![tok(1), alt(vec![tok(2), tok(3)]), eof()]))
///     .build()
///     .unwrap();
/// let input = CommonTokenStream::from_types(&[1, 3]);
/// let mut parser = ParserInterpreter::new(Arc::new(atn), input);
/// let trace = parser.parse(0).unwrap();
/// assert_eq!(trace.decisions(), vec![(0, 2)]);
/// ```
pub struct ParserInterpreter {
    sim: ParserAtnSimulator,
    input: CommonTokenStream,
    hooks: Box<dyn ParserHooks>,
    stack: Vec<RuleInvocation>,
}

impl ParserInterpreter {
    /// Interpreter over `input` with default settings and no hooks
    pub fn new(atn: Arc<Atn>, input: CommonTokenStream) -> Self {
        Self::from_simulator(ParserAtnSimulator::new(atn), input)
    }

    /// Interpreter over `input` with `config`
    pub fn with_config(atn: Arc<Atn>, input: CommonTokenStream, config: SimulatorConfig) -> Self {
        Self::from_simulator(ParserAtnSimulator::with_config(atn, config), input)
    }

    /// Interpreter driving an existing simulator, keeping its DFAs
    pub fn from_simulator(sim: ParserAtnSimulator, input: CommonTokenStream) -> Self {
        Self {
            sim,
            input,
            hooks: Box::new(NoHooks),
            stack: Vec::new(),
        }
    }

    /// Use `hooks` for predicates and actions
    pub fn with_hooks(mut self, hooks: impl ParserHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Register a diagnostic listener on the simulator
    pub fn add_listener(&mut self, listener: Box<dyn DiagnosticListener>) {
        self.sim.add_listener(listener);
    }

    /// The simulator
    pub fn simulator(&self) -> &ParserAtnSimulator {
        &self.sim
    }

    /// The simulator, mutably
    pub fn simulator_mut(&mut self) -> &mut ParserAtnSimulator {
        &mut self.sim
    }

    /// Give up the interpreter, keeping the simulator and its DFAs
    pub fn into_simulator(self) -> ParserAtnSimulator {
        self.sim
    }

    /// The token stream
    pub fn input(&self) -> &CommonTokenStream {
        &self.input
    }

    /// Replace the token stream
    pub fn set_input(&mut self, input: CommonTokenStream) {
        self.input = input;
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Parse `start_rule` from the current position
    ///
    /// The rule is not required to consume the whole input unless it ends
    /// with an explicit `EOF`.
    pub fn parse(&mut self, start_rule: usize) -> RecognitionResult<ParseTrace> {
        let atn = Arc::clone(self.sim.atn());
        if atn.kind != AtnKind::Parser {
            return Err(RecognitionError::invalid_atn("not a parser ATN"));
        }
        let start = *atn.rule_to_start.get(start_rule).ok_or_else(|| {
            RecognitionError::invalid_atn(format!("no rule {}", start_rule))
        })?;

        let mut trace = ParseTrace::default();
        self.stack.clear();
        self.stack.push(RuleInvocation::root(start_rule));
        trace.events.push(TraceEvent::EnterRule {
            rule_index: start_rule,
            token_index: self.input.index(),
        });

        let mut state = start;
        loop {
            let p = atn.state(state);
            if p.is_rule_stop() {
                let frame = self.stack.pop().ok_or_else(|| RecognitionError::Internal {
                    message: "rule stack underflow".into(),
                })?;
                trace.events.push(TraceEvent::ExitRule {
                    rule_index: frame.rule_index,
                    token_index: self.input.index(),
                });
                match frame.invoking_state {
                    None => return Ok(trace),
                    Some(invoking) => state = atn.follow_state(invoking)?,
                }
                continue;
            }

            let alt = match p.decision {
                Some(decision) if p.transitions.len() > 1 => {
                    let token_index = self.input.index();
                    let alt = self.sim.adaptive_predict(
                        &mut self.input,
                        decision,
                        &self.stack,
                        self.hooks.as_mut(),
                    )?;
                    trace.events.push(TraceEvent::Decision {
                        decision,
                        state,
                        alt,
                        token_index,
                    });
                    alt
                }
                _ => 1,
            };
            let t = p.transitions.get(alt - 1).ok_or_else(|| RecognitionError::Internal {
                message: format!("state {} has no alternative {}", state, alt),
            })?;
            state = self.visit(&atn, state, t, &mut trace)?;
        }
    }

    /// Parse the rule named `name`
    pub fn parse_rule(&mut self, name: &str) -> RecognitionResult<ParseTrace> {
        let rule = self
            .sim
            .atn()
            .rule_index(name)
            .ok_or_else(|| RecognitionError::invalid_atn(format!("no rule '{}'", name)))?;
        self.parse(rule)
    }

    /// Parse with SLL prediction first, falling back to full LL on a
    /// syntax error
    ///
    /// The fallback rewinds the buffered token stream to where the first
    /// attempt started instead of re-lexing. The simulator's prediction mode
    /// is restored afterwards.
    pub fn parse_two_stage(&mut self, start_rule: usize) -> RecognitionResult<ParseTrace> {
        let start_index = self.input.index();
        let mode = self.sim.prediction_mode();

        self.sim.set_prediction_mode(PredictionMode::Sll);
        let result = match self.parse(start_rule) {
            Err(e) if e.is_syntax_error() => {
                log_debug!("SLL parse failed ({}), retrying with full LL", e);
                self.input.seek(start_index);
                self.sim.set_prediction_mode(match mode {
                    PredictionMode::Sll => PredictionMode::Ll,
                    other => other,
                });
                self.parse(start_rule)
            }
            other => other,
        };
        self.sim.set_prediction_mode(mode);
        result
    }

    /// Follow `t` out of `state`, returning the next state
    fn visit(
        &mut self,
        atn: &Atn,
        state: usize,
        t: &Transition,
        trace: &mut ParseTrace,
    ) -> RecognitionResult<usize> {
        match t {
            Transition::Epsilon { target } | Transition::Return { target } => Ok(*target),
            Transition::Rule {
                target,
                rule_index,
                precedence,
                ..
            } => {
                self.stack
                    .push(RuleInvocation::invoked(*rule_index, state, *precedence));
                trace.events.push(TraceEvent::EnterRule {
                    rule_index: *rule_index,
                    token_index: self.input.index(),
                });
                Ok(*target)
            }
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                let ctx = ctx_dependent.then_some(self.stack.as_slice());
                if !self.hooks.sempred(ctx, *rule_index, *pred_index) {
                    let predicate = SemanticContext::Predicate {
                        rule_index: *rule_index,
                        pred_index: *pred_index,
                        ctx_dependent: *ctx_dependent,
                    };
                    return Err(RecognitionError::FailedPredicate {
                        rule_index: *rule_index,
                        predicate: predicate.to_string(),
                        index: self.input.index(),
                    });
                }
                Ok(*target)
            }
            Transition::Precedence { target, precedence } => {
                if !self.hooks.precpred(&self.stack, *precedence) {
                    return Err(RecognitionError::FailedPredicate {
                        rule_index: atn.state(state).rule_index,
                        predicate: SemanticContext::Precedence(*precedence).to_string(),
                        index: self.input.index(),
                    });
                }
                Ok(*target)
            }
            Transition::Action {
                target,
                rule_index,
                action_index,
                ..
            } => {
                self.hooks.action(&self.stack, *rule_index, *action_index);
                Ok(*target)
            }
            _ => {
                let la = self.input.la(1);
                if !t.matches(la, atn.min_symbol(), atn.max_token_type) {
                    return Err(RecognitionError::InputMismatch {
                        state,
                        found: la,
                        index: self.input.index(),
                    });
                }
                trace.events.push(TraceEvent::Match {
                    token_type: la,
                    token_index: self.input.index(),
                });
                if la != EOF {
                    self.input.consume();
                }
                Ok(t.target())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::*;
    use crate::runtime::listener::{Diagnostic, RecordingListener};

    // s : (1 x 2 | 3 x) EOF ;  x : 5 | 5 2 ;
    fn caller_dependent() -> Arc<Atn> {
        Arc::new(
            AtnBuilder::parser(5)
                .rule(
                    "s",
                    seq(vec![
                        alt(vec![
                            seq(vec![tok(1), rule("x"), tok(2)]),
                            seq(vec![tok(3), rule("x")]),
                        ]),
                        eof(),
                    ]),
                )
                .rule("x", alt(vec![tok(5), seq(vec![tok(5), tok(2)])]))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_trace_records_rules_and_matches() {
        let mut parser =
            ParserInterpreter::new(caller_dependent(), CommonTokenStream::from_types(&[1, 5, 2]));
        let trace = parser.parse_rule("s").unwrap();
        assert_eq!(trace.matched(), vec![1, 5, 2, EOF]);
        assert_eq!(trace.decisions(), vec![(0, 1), (1, 1)]);
        assert_eq!(
            trace.events.first(),
            Some(&TraceEvent::EnterRule {
                rule_index: 0,
                token_index: 0
            })
        );
        assert!(matches!(
            trace.events.last(),
            Some(TraceEvent::ExitRule { rule_index: 0, .. })
        ));
    }

    #[test]
    fn test_full_context_resolves_by_caller() {
        let mut parser =
            ParserInterpreter::new(caller_dependent(), CommonTokenStream::from_types(&[3, 5, 2]));
        let recorder = RecordingListener::new();
        parser.add_listener(Box::new(recorder.clone()));
        let trace = parser.parse(0).unwrap();
        assert_eq!(trace.decisions(), vec![(0, 2), (1, 2)]);
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, Diagnostic::ContextSensitivity { decision: 1, prediction: 2, .. })));
    }

    #[test]
    fn test_sll_alone_fails_and_two_stage_recovers() {
        let config = SimulatorConfig::new().with_prediction_mode(PredictionMode::Sll);
        let input = CommonTokenStream::from_types(&[3, 5, 2]);
        let mut parser = ParserInterpreter::with_config(caller_dependent(), input.clone(), config);
        let err = parser.parse(0).unwrap_err();
        assert!(matches!(
            err,
            RecognitionError::InputMismatch {
                found: 2,
                index: 2,
                ..
            }
        ));

        parser.set_input(input);
        let trace = parser.parse_two_stage(0).unwrap();
        assert_eq!(trace.decisions(), vec![(0, 2), (1, 2)]);
        assert_eq!(parser.simulator().prediction_mode(), PredictionMode::Sll);
    }

    struct Deny;

    impl ParserHooks for Deny {
        fn sempred(&mut self, _ctx: Option<&[RuleInvocation]>, _rule: usize, _pred: usize) -> bool {
            false
        }
    }

    #[test]
    fn test_failed_predicate_outside_decision() {
        let atn = AtnBuilder::parser(1)
            .rule("s", seq(vec![pred(4), tok(1)]))
            .build()
            .unwrap();
        let mut parser = ParserInterpreter::new(Arc::new(atn), CommonTokenStream::from_types(&[1]))
            .with_hooks(Deny);
        assert_eq!(
            parser.parse(0),
            Err(RecognitionError::FailedPredicate {
                rule_index: 0,
                predicate: "{0:4}?".into(),
                index: 0,
            })
        );
    }
}

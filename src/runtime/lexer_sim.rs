//! Maximal-munch lexer simulation
//!
//! Each lexer mode has a DFA built lazily from the mode's tokens-start state.
//! [`LexerAtnSimulator::match_token`] runs it from the current position for
//! as long as edges exist, remembering the last accept state seen, then
//! rolls the input back to that accept. Ties between rules matching the same
//! text go to the rule declared first: lexer configuration sets keep
//! insertion order and the accept state takes the first configuration that
//! finished its rule.
//!
//! Edges are cached for the ASCII range only, and never when a predicate
//! took part in computing the target.

use super::cache::{PredictionCache, SimulatorStats};
use super::config::{AtnConfig, ConfigSet};
use super::context::{ContextId, EMPTY_RETURN_STATE};
use super::dfa::{DfaState, DfaStateId};
use super::error::{RecognitionError, RecognitionResult};
use super::graph::{Atn, AtnKind};
use super::lexer_action::{LexerActionExecutor, LexerCursor, LexerHooks};
use super::sim_config::SimulatorConfig;
use super::stream::{CharStream, IntStream};
use super::token::{EOF, MAX_CHAR_VALUE, MIN_CHAR_VALUE};
use super::transition::Transition;
use hashbrown::HashSet;
use std::sync::Arc;

/// Smallest symbol with a cached DFA edge
pub const MIN_DFA_EDGE: i32 = 0;

/// Largest symbol with a cached DFA edge
pub const MAX_DFA_EDGE: i32 = 127;

/// A committed match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerMatch {
    /// Token type, or `EOF` at end of input
    pub token_type: i32,
    /// Commands to run for the token
    pub executor: Option<Arc<LexerActionExecutor>>,
}

/// Position and DFA state of the last accept seen
#[derive(Debug, Clone, Copy)]
struct SimState {
    index: usize,
    line: usize,
    column: usize,
    state: DfaStateId,
}

enum Frame {
    Pop { config: AtnConfig, next: usize },
    Walk { config: AtnConfig, next: usize },
}

/// Per-call closure state
struct Closure<'a> {
    out: &'a mut ConfigSet,
    visited: HashSet<AtnConfig>,
    stack: Vec<Frame>,
    /// The current alternative already finished its rule
    reached_accept: bool,
    speculative: bool,
    treat_eof_as_epsilon: bool,
}

/// Lexer ATN simulator with its per-mode DFAs
///
/// # Example
///
/// ```rust
/// use atnsim::runtime::builder::*;
/// use atnsim::runtime::{CharStream, LexerAtnSimulator, NoHooks};
/// use std::sync::Arc;
///
/// let atn = AtnBuilder::lexer()
///     .token("A", 1, ch('a'))
///     .token("AB", 2, lit("ab"))
///     .build()
///     .unwrap();
/// let mut sim = LexerAtnSimulator::new(Arc::new(atn));
/// let mut input = CharStream::new("ab");
/// let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
/// assert_eq!(m.token_type, 2);
/// ```
pub struct LexerAtnSimulator {
    atn: Arc<Atn>,
    cache: PredictionCache,
    config: SimulatorConfig,
    stats: SimulatorStats,
    start_index: usize,
    line: usize,
    column: usize,
}

impl LexerAtnSimulator {
    /// Simulator with empty DFAs and default settings
    pub fn new(atn: Arc<Atn>) -> Self {
        Self::with_config(atn, SimulatorConfig::default())
    }

    /// Simulator with empty DFAs
    pub fn with_config(atn: Arc<Atn>, config: SimulatorConfig) -> Self {
        let cache = PredictionCache::new(&atn);
        Self {
            atn,
            cache,
            config,
            stats: SimulatorStats::default(),
            start_index: 0,
            line: 1,
            column: 0,
        }
    }

    /// Simulator reusing DFAs filled by an earlier simulator over `atn`
    pub fn with_cache(
        atn: Arc<Atn>,
        cache: PredictionCache,
        config: SimulatorConfig,
    ) -> RecognitionResult<Self> {
        if !cache.fits(&atn) {
            return Err(RecognitionError::invalid_atn(
                "lexer cache was built for a different ATN",
            ));
        }
        let mut sim = Self::with_config(atn, config);
        sim.cache = cache;
        Ok(sim)
    }

    /// Give up the simulator, keeping its DFAs
    pub fn into_cache(self) -> PredictionCache {
        self.cache
    }

    /// The ATN
    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    /// The DFA cache
    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    /// Counters since creation or the last reset
    pub fn stats(&self) -> SimulatorStats {
        self.stats
    }

    /// Reset the counters
    pub fn reset_stats(&mut self) {
        self.stats = SimulatorStats::default();
    }

    /// Drop cached DFA states of the mode with `decision`, or all of them
    pub fn clear_cache(&mut self, decision: Option<usize>) {
        self.cache.clear(decision);
    }

    /// Current line (1-based)
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Current column (0-based)
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Move the line/column tracking, e.g. after the driver rewinds
    pub fn set_position(&mut self, line: usize, column: usize) {
        self.line = line;
        self.column = column;
    }

    /// Consume one character, keeping line and column current
    pub fn consume(&mut self, input: &mut CharStream) {
        if input.la(1) == '\n' as i32 {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        input.consume();
    }

    fn mode_decision(&self, mode: usize) -> RecognitionResult<usize> {
        if self.atn.kind != AtnKind::Lexer {
            return Err(RecognitionError::invalid_atn("not a lexer ATN"));
        }
        self.atn
            .mode_to_start
            .get(mode)
            .and_then(|&s| self.atn.state(s).decision)
            .ok_or_else(|| RecognitionError::invalid_atn(format!("no lexer mode {}", mode)))
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Match one token in `mode` starting at the current input position
    ///
    /// On success the input sits after the token and the returned executor
    /// still has to be run. At end of input the type is `EOF`.
    pub fn match_token(
        &mut self,
        input: &mut CharStream,
        mode: usize,
        hooks: &mut dyn LexerHooks,
    ) -> RecognitionResult<LexerMatch> {
        let decision = self.mode_decision(mode)?;
        self.start_index = input.index();
        let start_line = self.line;
        let start_column = self.column;

        let s0 = match self.cache.dfa(decision).start() {
            Some(s0) => s0,
            None => {
                let mode_start = self.atn.mode_to_start[mode];
                let mut configs = self.compute_start_state(input, mode_start, hooks)?;
                let suppress_edge = configs.has_semantic_context;
                configs.has_semantic_context = false;
                let s0 = self.add_dfa_state(decision, configs);
                if !suppress_edge {
                    self.cache.dfa_mut(decision).set_start(s0);
                }
                s0
            }
        };

        let mut prev_accept: Option<SimState> = None;
        if self.cache.dfa(decision).state(s0).is_accept {
            prev_accept = Some(self.capture(input, s0));
        }

        let mut t = input.la(1);
        let mut s = s0;
        loop {
            let cached = if (MIN_DFA_EDGE..=MAX_DFA_EDGE).contains(&t) {
                self.cache.dfa(decision).edge(s, t)
            } else {
                None
            };
            let target = match cached {
                Some(target) => {
                    self.stats.dfa_hits += 1;
                    target
                }
                None => {
                    self.stats.dfa_misses += 1;
                    self.compute_target_state(decision, input, s, t, hooks)?
                }
            };
            log_trace!("mode {}: {} --{}--> {}", mode, s, t, target);
            if target.is_error() {
                break;
            }
            if t != EOF {
                self.consume(input);
            }
            if self.cache.dfa(decision).state(target).is_accept {
                prev_accept = Some(self.capture(input, target));
                if t == EOF {
                    break;
                }
            }
            t = input.la(1);
            s = target;
        }

        match prev_accept {
            Some(accept) => {
                input.seek(accept.index);
                self.line = accept.line;
                self.column = accept.column;
                let state = self.cache.dfa(decision).state(accept.state);
                Ok(LexerMatch {
                    token_type: state.token_type,
                    executor: state.lexer_executor.clone(),
                })
            }
            None if t == EOF && input.index() == self.start_index => Ok(LexerMatch {
                token_type: EOF,
                executor: None,
            }),
            None => Err(RecognitionError::LexerNoViableAlt {
                mode,
                start_index: self.start_index,
                index: input.index(),
                line: start_line,
                column: start_column,
            }),
        }
    }

    fn capture(&self, input: &CharStream, state: DfaStateId) -> SimState {
        SimState {
            index: input.index(),
            line: self.line,
            column: self.column,
            state,
        }
    }

    fn compute_target_state(
        &mut self,
        decision: usize,
        input: &mut CharStream,
        from: DfaStateId,
        t: i32,
        hooks: &mut dyn LexerHooks,
    ) -> RecognitionResult<DfaStateId> {
        let configs = self.cache.dfa(decision).state(from).configs.clone();
        let mut reach = ConfigSet::ordered();
        self.reachable_config_set(input, &configs, &mut reach, t, hooks)?;

        if reach.is_empty() {
            if !reach.has_semantic_context {
                self.add_edge(decision, from, t, DfaStateId::ERROR);
            }
            return Ok(DfaStateId::ERROR);
        }

        let suppress_edge = reach.has_semantic_context;
        reach.has_semantic_context = false;
        let to = self.add_dfa_state(decision, reach);
        if !suppress_edge {
            self.add_edge(decision, from, t, to);
        }
        Ok(to)
    }

    fn add_edge(&mut self, decision: usize, from: DfaStateId, t: i32, to: DfaStateId) {
        if (MIN_DFA_EDGE..=MAX_DFA_EDGE).contains(&t) {
            self.cache.dfa_mut(decision).set_edge(from, t, to);
        }
    }

    /// Wrap `configs` in a DFA state; the first configuration that finished
    /// its rule decides the token
    fn add_dfa_state(&mut self, decision: usize, configs: ConfigSet) -> DfaStateId {
        let mut state = DfaState::new(configs);
        let accept = state
            .configs
            .iter()
            .find(|c| self.atn.state(c.state).is_rule_stop())
            .map(|c| {
                let rule = self.atn.state(c.state).rule_index;
                (self.atn.rule_to_token_type[rule], c.lexer_executor.clone())
            });
        if let Some((token_type, executor)) = accept {
            state.is_accept = true;
            state.token_type = token_type;
            state.lexer_executor = executor;
        }
        self.cache.add_state(decision, state)
    }

    /// Advance every configuration of `closure` over `t` into `reach`
    ///
    /// Once an alternative reaches an accept state its remaining
    /// configurations are skipped.
    fn reachable_config_set(
        &mut self,
        input: &mut CharStream,
        closure: &ConfigSet,
        reach: &mut ConfigSet,
        t: i32,
        hooks: &mut dyn LexerHooks,
    ) -> RecognitionResult<()> {
        let atn = Arc::clone(&self.atn);
        let mut skip_alt: Option<usize> = None;
        for c in closure {
            let alt_reached_accept = skip_alt == Some(c.alt);
            if alt_reached_accept && c.passed_through_non_greedy {
                continue;
            }
            for trans in &atn.state(c.state).transitions {
                if !trans.matches(t, MIN_CHAR_VALUE, MAX_CHAR_VALUE) {
                    continue;
                }
                let executor = c
                    .lexer_executor
                    .as_ref()
                    .map(|e| e.fix_offset_before_match(input.index() - self.start_index));
                let mut next = self.lexer_config(c, trans.target());
                next.lexer_executor = executor;
                let mut state = Closure {
                    out: &mut *reach,
                    visited: HashSet::new(),
                    stack: Vec::new(),
                    reached_accept: alt_reached_accept,
                    speculative: true,
                    treat_eof_as_epsilon: t == EOF,
                };
                if self.closure(input, next, &mut state, hooks)? {
                    skip_alt = Some(c.alt);
                    break;
                }
            }
        }
        Ok(())
    }

    fn compute_start_state(
        &mut self,
        input: &mut CharStream,
        p: usize,
        hooks: &mut dyn LexerHooks,
    ) -> RecognitionResult<ConfigSet> {
        let atn = Arc::clone(&self.atn);
        let mut configs = ConfigSet::ordered();
        for (i, t) in atn.state(p).transitions.iter().enumerate() {
            let c = AtnConfig::new(t.target(), i + 1, ContextId::EMPTY);
            let mut state = Closure {
                out: &mut configs,
                visited: HashSet::new(),
                stack: Vec::new(),
                reached_accept: false,
                speculative: false,
                treat_eof_as_epsilon: false,
            };
            self.closure(input, c, &mut state, hooks)?;
        }
        Ok(configs)
    }

    /// `config` moved to `target`, noting non-greedy decisions on the way
    fn lexer_config(&self, config: &AtnConfig, target: usize) -> AtnConfig {
        let mut c = config.moved_to(target);
        let state = self.atn.state(target);
        c.passed_through_non_greedy |= state.non_greedy && state.kind.is_decision_kind();
        c
    }

    // ========================================================================
    // Closure
    // ========================================================================

    /// Close `config` into `state.out`; returns whether the alternative
    /// reached an accept state
    fn closure(
        &mut self,
        input: &mut CharStream,
        config: AtnConfig,
        state: &mut Closure<'_>,
        hooks: &mut dyn LexerHooks,
    ) -> RecognitionResult<bool> {
        self.stats.closure_calls += 1;
        let atn = Arc::clone(&self.atn);
        self.enter(&atn, config, state)?;

        while let Some(frame) = state.stack.last_mut() {
            match frame {
                Frame::Pop { config, next } => {
                    let len = self.cache.contexts.len_of(config.context);
                    if *next >= len {
                        state.stack.pop();
                        continue;
                    }
                    let i = *next;
                    *next += 1;
                    let config = config.clone();
                    let return_state = self.cache.contexts.return_state(config.context, i);
                    if return_state == EMPTY_RETURN_STATE {
                        continue;
                    }
                    let parent = self.cache.contexts.parent(config.context, i);
                    self.enter(&atn, config.with_context(return_state, parent), state)?;
                }
                Frame::Walk { config, next } => {
                    let transitions = &atn.state(config.state).transitions;
                    if *next >= transitions.len() {
                        state.stack.pop();
                        continue;
                    }
                    let t = &transitions[*next];
                    *next += 1;
                    let config = config.clone();
                    if let Some(c) = self.epsilon_target(input, &config, t, state, hooks) {
                        self.enter(&atn, c, state)?;
                    }
                }
            }
        }
        Ok(state.reached_accept)
    }

    fn enter(&mut self, atn: &Atn, config: AtnConfig, state: &mut Closure<'_>) -> RecognitionResult<()> {
        let contexts = &mut self.cache.contexts;
        if atn.state(config.state).is_rule_stop() {
            if config.context.is_empty() {
                state.out.add(config, contexts);
                state.reached_accept = true;
                return Ok(());
            }
            if contexts.has_empty_path(config.context) {
                state
                    .out
                    .add(config.with_context(config.state, ContextId::EMPTY), contexts);
                state.reached_accept = true;
            }
            return self.push(state, Frame::Pop { config, next: 0 });
        }

        if !state.visited.insert(config.clone()) {
            return Ok(());
        }
        if !atn.state(config.state).epsilon_only
            && (!state.reached_accept || !config.passed_through_non_greedy)
        {
            state.out.add(config.clone(), contexts);
        }
        self.push(state, Frame::Walk { config, next: 0 })
    }

    fn push(&self, state: &mut Closure<'_>, frame: Frame) -> RecognitionResult<()> {
        if state.stack.len() >= self.config.max_closure_depth {
            return Err(RecognitionError::ClosureDepthExceeded {
                depth: state.stack.len() + 1,
                max_depth: self.config.max_closure_depth,
            });
        }
        state.stack.push(frame);
        Ok(())
    }

    fn epsilon_target(
        &mut self,
        input: &mut CharStream,
        config: &AtnConfig,
        t: &Transition,
        state: &mut Closure<'_>,
        hooks: &mut dyn LexerHooks,
    ) -> Option<AtnConfig> {
        match t {
            Transition::Rule {
                target,
                follow_state,
                ..
            } => {
                let context = self.cache.contexts.singleton(config.context, *follow_state);
                let mut c = self.lexer_config(config, *target);
                c.context = context;
                Some(c)
            }
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                ..
            } => {
                state.out.has_semantic_context = true;
                self.evaluate_predicate(input, *rule_index, *pred_index, state.speculative, hooks)
                    .then(|| self.lexer_config(config, *target))
            }
            Transition::Action {
                target,
                action_index,
                ..
            } => {
                let mut c = self.lexer_config(config, *target);
                // actions in rules called from other rules are ignored
                if self.cache.contexts.has_empty_path(config.context) {
                    if let Some(action) = self.atn.lexer_actions.get(*action_index) {
                        c.lexer_executor = Some(LexerActionExecutor::append(
                            config.lexer_executor.as_ref(),
                            action.clone(),
                        ));
                    }
                }
                Some(c)
            }
            Transition::Epsilon { target } | Transition::Return { target } => {
                Some(self.lexer_config(config, *target))
            }
            Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. } => (state.treat_eof_as_epsilon
                && t.matches(EOF, MIN_CHAR_VALUE, MAX_CHAR_VALUE))
            .then(|| self.lexer_config(config, *target)),
            _ => None,
        }
    }

    /// Evaluate a lexer predicate; speculative evaluation sees the current
    /// character as consumed
    fn evaluate_predicate(
        &mut self,
        input: &mut CharStream,
        rule_index: usize,
        pred_index: usize,
        speculative: bool,
        hooks: &mut dyn LexerHooks,
    ) -> bool {
        if !speculative {
            let cursor = self.cursor(input);
            return hooks.sempred(rule_index, pred_index, cursor);
        }
        let (index, line, column) = (input.index(), self.line, self.column);
        self.consume(input);
        let cursor = self.cursor(input);
        let holds = hooks.sempred(rule_index, pred_index, cursor);
        input.seek(index);
        self.line = line;
        self.column = column;
        holds
    }

    fn cursor(&self, input: &CharStream) -> LexerCursor {
        LexerCursor {
            index: input.index(),
            line: self.line,
            column: self.column,
            token_start: self.start_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::*;
    use crate::runtime::lexer_action::LexerAction;
    use crate::runtime::semantic::NoHooks;

    fn sim(atn: Atn) -> LexerAtnSimulator {
        LexerAtnSimulator::new(Arc::new(atn))
    }

    fn a_ab() -> Atn {
        AtnBuilder::lexer()
            .token("A", 1, ch('a'))
            .token("AB", 2, lit("ab"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_longest_match_wins() {
        let mut sim = sim(a_ab());
        let mut input = CharStream::new("ab");
        let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(m.token_type, 2);
        assert_eq!(input.index(), 2);
        let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(m.token_type, EOF);
    }

    #[test]
    fn test_rolls_back_to_last_accept() {
        let mut sim = sim(a_ab());
        let mut input = CharStream::new("ac");
        let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(m.token_type, 1);
        assert_eq!(input.index(), 1);
        let err = sim.match_token(&mut input, 0, &mut NoHooks).unwrap_err();
        assert_eq!(
            err,
            RecognitionError::LexerNoViableAlt {
                mode: 0,
                start_index: 1,
                index: 1,
                line: 1,
                column: 1,
            }
        );
    }

    #[test]
    fn test_earlier_rule_wins_tie() {
        let atn = AtnBuilder::lexer()
            .token("IF", 1, lit("if"))
            .token("ID", 2, plus(char_range('a', 'z')))
            .build()
            .unwrap();
        let mut sim = sim(atn);
        let mut input = CharStream::new("if");
        assert_eq!(sim.match_token(&mut input, 0, &mut NoHooks).unwrap().token_type, 1);
        let mut input = CharStream::new("ifx");
        assert_eq!(sim.match_token(&mut input, 0, &mut NoHooks).unwrap().token_type, 2);
    }

    #[test]
    fn test_non_greedy_loop_stops_early() {
        let atn = AtnBuilder::lexer()
            .token("C", 1, seq(vec![lit("/*"), star_lazy(any()), lit("*/")]))
            .token("STAR", 2, ch('*'))
            .token("SLASH", 3, ch('/'))
            .build()
            .unwrap();
        let mut sim = sim(atn);
        let mut input = CharStream::new("/* a */*/");
        let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(m.token_type, 1);
        assert_eq!(input.index(), 7);
    }

    #[test]
    fn test_commands_ride_on_the_match() {
        let atn = AtnBuilder::lexer()
            .token("WS", 1, seq(vec![plus(ch(' ')), command(LexerAction::Skip)]))
            .build()
            .unwrap();
        let mut sim = sim(atn);
        let mut input = CharStream::new("   ");
        let m = sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(m.token_type, 1);
        let executor = m.executor.unwrap();
        assert_eq!(executor.actions(), &[LexerAction::Skip]);
    }

    #[test]
    fn test_line_tracking() {
        let atn = AtnBuilder::lexer()
            .token("NL", 1, ch('\n'))
            .token("X", 2, ch('x'))
            .build()
            .unwrap();
        let mut sim = sim(atn);
        let mut input = CharStream::new("x\nx");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!((sim.line(), sim.column()), (1, 1));
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!((sim.line(), sim.column()), (2, 0));
    }

    #[test]
    fn test_ascii_edges_are_cached() {
        let mut sim = sim(a_ab());
        let mut input = CharStream::new("ab");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        let closures = sim.stats().closure_calls;
        let mut input = CharStream::new("ab");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert_eq!(sim.stats().closure_calls, closures);

        // non-ASCII edges are recomputed every time
        let atn = AtnBuilder::lexer().token("E", 1, ch('é')).build().unwrap();
        let mut sim = LexerAtnSimulator::new(Arc::new(atn));
        let mut input = CharStream::new("é");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        let closures = sim.stats().closure_calls;
        let mut input = CharStream::new("é");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();
        assert!(sim.stats().closure_calls > closures);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let mut sim = sim(a_ab());
        let mut input = CharStream::new("a");
        assert!(matches!(
            sim.match_token(&mut input, 3, &mut NoHooks),
            Err(RecognitionError::InvalidAtn { .. })
        ));
    }
}

//! Adaptive prediction for parser decisions
//!
//! [`ParserAtnSimulator::adaptive_predict`] answers "which alternative of
//! decision `d` matches the upcoming tokens". It first walks the decision's
//! DFA with SLL configurations (contexts that ignore the caller's stack),
//! computing missing edges from the ATN as it goes. When an SLL state is a
//! conflict the lookahead cannot resolve, prediction restarts in full-context
//! mode from the caller's real stack. Among alternatives still viable at the
//! end the lowest one wins.
//!
//! Predicates met at the decision's left edge are collected rather than
//! evaluated in SLL mode; the DFA accept state then carries `(predicate,
//! alt)` pairs evaluated in alternative order on every visit.

use super::alt_set::AltSet;
use super::cache::{PredictionCache, SimulatorStats};
use super::config::{AtnConfig, ConfigSet};
use super::context::{ContextId, EMPTY_RETURN_STATE};
use super::dfa::{DfaState, DfaStateId, PredPrediction};
use super::error::{RecognitionError, RecognitionResult};
use super::graph::Atn;
use super::listener::DiagnosticListener;
use super::prediction_mode::{self, PredictionMode};
use super::rule_context::RuleInvocation;
use super::semantic::{ParserHooks, SemanticContext};
use super::sim_config::SimulatorConfig;
use super::stream::TokenStream;
use super::token::EOF;
use super::transition::Transition;
use hashbrown::HashSet;
use std::sync::Arc;

/// What a full-context closure needs to evaluate predicates on the spot
struct Lookahead<'a> {
    input: &'a mut dyn TokenStream,
    hooks: &'a mut dyn ParserHooks,
    outer: &'a [RuleInvocation],
    decision: usize,
    start_index: usize,
    steps: usize,
}

enum Frame {
    /// Popping the contexts of a configuration in a rule stop state
    Pop {
        config: AtnConfig,
        depth: i32,
        collect: bool,
        next: usize,
    },
    /// Following the epsilon transitions of a configuration
    Walk {
        config: AtnConfig,
        depth: i32,
        collect: bool,
        next: usize,
    },
}

type Visited = HashSet<(usize, usize, ContextId, SemanticContext)>;

/// Parser ATN simulator with its prediction cache
///
/// # Example
///
/// ```rust
/// use atnsim::runtime::builder::*;
/// use atnsim::runtime::{CommonTokenStream, NoHooks, ParserAtnSimulator, RuleInvocation};
/// use std::sync::Arc;
///
/// // r : 1 2 | 1 3 ;
/// let atn = AtnBuilder::parser(3)
///     .rule("r", alt(vec![seq(vec![tok(1), tok(2)]), seq(vec![tok(1), tok(3)])]))
///     .build()
///     .unwrap();
/// let mut sim = ParserAtnSimulator::new(Arc::new(atn));
/// let mut input = CommonTokenStream::from_types(&[1, 3]);
/// let alt = sim
///     .adaptive_predict(&mut input, 0, &[RuleInvocation::root(0)], &mut NoHooks)
///     .unwrap();
/// assert_eq!(alt, 2);
/// ```
pub struct ParserAtnSimulator {
    atn: Arc<Atn>,
    cache: PredictionCache,
    config: SimulatorConfig,
    listeners: Vec<Box<dyn DiagnosticListener>>,
    stats: SimulatorStats,
}

impl ParserAtnSimulator {
    /// Simulator with an empty cache and default settings
    pub fn new(atn: Arc<Atn>) -> Self {
        Self::with_config(atn, SimulatorConfig::default())
    }

    /// Simulator with an empty cache
    pub fn with_config(atn: Arc<Atn>, config: SimulatorConfig) -> Self {
        let cache = PredictionCache::new(&atn);
        Self {
            atn,
            cache,
            config,
            listeners: Vec::new(),
            stats: SimulatorStats::default(),
        }
    }

    /// Simulator reusing a cache filled by an earlier simulator over `atn`
    pub fn with_cache(
        atn: Arc<Atn>,
        cache: PredictionCache,
        config: SimulatorConfig,
    ) -> RecognitionResult<Self> {
        if !cache.fits(&atn) {
            return Err(RecognitionError::invalid_atn(
                "prediction cache was built for a different ATN",
            ));
        }
        Ok(Self {
            atn,
            cache,
            config,
            listeners: Vec::new(),
            stats: SimulatorStats::default(),
        })
    }

    /// Give up the simulator, keeping its cache
    pub fn into_cache(self) -> PredictionCache {
        self.cache
    }

    /// The ATN
    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    /// The prediction cache
    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    /// Current settings
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Current prediction mode
    pub fn prediction_mode(&self) -> PredictionMode {
        self.config.prediction_mode
    }

    /// Switch prediction mode; cached DFA states stay valid
    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        self.config.prediction_mode = mode;
    }

    /// Register a diagnostic listener
    pub fn add_listener(&mut self, listener: Box<dyn DiagnosticListener>) {
        self.listeners.push(listener);
    }

    /// Drop every listener
    pub fn remove_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Counters since creation or the last reset
    pub fn stats(&self) -> SimulatorStats {
        self.stats
    }

    /// Reset the counters
    pub fn reset_stats(&mut self) {
        self.stats = SimulatorStats::default();
    }

    /// Drop cached DFA states of `decision`, or everything when `None`
    pub fn clear_cache(&mut self, decision: Option<usize>) {
        log_debug!("clearing parser DFA cache: {:?}", decision);
        self.cache.clear(decision);
    }

    // ========================================================================
    // Prediction
    // ========================================================================

    /// Predict the alternative of `decision` for the tokens at `input`
    ///
    /// `outer` is the caller's rule-invocation stack, outermost first. The
    /// input is back at its starting index when this returns, whatever the
    /// outcome.
    pub fn adaptive_predict(
        &mut self,
        input: &mut dyn TokenStream,
        decision: usize,
        outer: &[RuleInvocation],
        hooks: &mut dyn ParserHooks,
    ) -> RecognitionResult<usize> {
        if decision >= self.atn.num_decisions() {
            return Err(RecognitionError::Internal {
                message: format!("no decision {}", decision),
            });
        }
        let start_index = input.index();
        let mut la = Lookahead {
            input,
            hooks,
            outer,
            decision,
            start_index,
            steps: 0,
        };

        let result = self.predict_from_start(&mut la);
        la.input.seek(start_index);
        // merges are memoized per prediction only
        self.cache.contexts.clear_merge_cache();

        log_debug!("predict d={} at {}: {:?}", decision, start_index, result);
        result
    }

    fn predict_from_start(&mut self, la: &mut Lookahead<'_>) -> RecognitionResult<usize> {
        let decision = la.decision;
        let s0 = match self.cache.dfa(decision).start() {
            Some(s0) => s0,
            None => {
                let start_state = self.cache.dfa(decision).atn_start_state;
                let configs = self.compute_start_state(start_state, &[], false, Some(&mut *la))?;
                let s0 = self.cache.get_or_create_state(decision, configs);
                self.cache.dfa_mut(decision).set_start(s0);
                s0
            }
        };
        self.exec_atn(s0, la)
    }

    fn exec_atn(&mut self, s0: DfaStateId, la: &mut Lookahead<'_>) -> RecognitionResult<usize> {
        let decision = la.decision;
        let mut previous = s0;
        let mut t = la.input.la(1);

        loop {
            self.count_step(la)?;
            let d = self.step(decision, previous, t)?;

            if d.is_error() {
                let offending_index = la.input.index();
                la.input.seek(la.start_index);
                let configs = self.cache.dfa(decision).state(previous).configs.clone();
                if let Some(alt) = self.syn_valid_or_sem_invalid_alt(&configs, la) {
                    return Ok(alt);
                }
                return Err(RecognitionError::NoViableAlt {
                    decision,
                    start_index: la.start_index,
                    offending_index,
                    offending_type: t,
                });
            }

            let (requires_full_context, is_accept, prediction, predicates) = {
                let state = self.cache.dfa(decision).state(d);
                (
                    state.requires_full_context,
                    state.is_accept,
                    state.prediction,
                    state.predicates.clone(),
                )
            };

            if requires_full_context && self.config.prediction_mode != PredictionMode::Sll {
                let mut conflicting = self
                    .cache
                    .dfa(decision)
                    .state(d)
                    .configs
                    .conflicting_alts
                    .clone()
                    .unwrap_or_default();
                if let Some(preds) = &predicates {
                    let conflict_index = la.input.index();
                    if conflict_index != la.start_index {
                        la.input.seek(la.start_index);
                    }
                    conflicting = eval_predicates(preds, la, true);
                    if conflicting.len() == 1 {
                        if let Some(alt) = conflicting.min() {
                            self.stats.sll_predictions += 1;
                            return Ok(alt);
                        }
                    }
                    if conflict_index != la.start_index {
                        la.input.seek(conflict_index);
                    }
                }

                let stop_index = la.input.index();
                log_debug!(
                    "d={}: SLL conflict {} at {}..{}, retrying with full context",
                    decision,
                    conflicting,
                    la.start_index,
                    stop_index
                );
                let configs = &self.cache.dfa(decision).state(d).configs;
                for listener in &mut self.listeners {
                    listener.report_attempting_full_context(
                        decision,
                        configs,
                        la.start_index,
                        stop_index,
                        &conflicting,
                    );
                }

                self.stats.ll_predictions += 1;
                let start_state = self.cache.dfa(decision).atn_start_state;
                let outer = la.outer;
                let s0_full = self.compute_start_state(start_state, outer, true, Some(&mut *la))?;
                return self.exec_atn_with_full_context(s0_full, la);
            }

            if is_accept {
                let Some(preds) = predicates else {
                    self.stats.sll_predictions += 1;
                    return prediction.ok_or_else(|| RecognitionError::Internal {
                        message: format!("accept state {} of decision {} has no prediction", d, decision),
                    });
                };
                let stop_index = la.input.index();
                la.input.seek(la.start_index);
                let alts = eval_predicates(&preds, la, true);
                self.stats.sll_predictions += 1;
                return alts.min().ok_or(RecognitionError::NoViableAlt {
                    decision,
                    start_index: la.start_index,
                    offending_index: stop_index,
                    offending_type: t,
                });
            }

            previous = d;
            if t != EOF {
                la.input.consume();
                t = la.input.la(1);
            }
        }
    }

    fn exec_atn_with_full_context(
        &mut self,
        s0: ConfigSet,
        la: &mut Lookahead<'_>,
    ) -> RecognitionResult<usize> {
        let decision = la.decision;
        let exact_mode = self.config.prediction_mode == PredictionMode::LlExactAmbigDetection;
        let mut found_exact_ambig = false;
        let mut previous = s0;
        la.input.seek(la.start_index);
        let mut t = la.input.la(1);

        let (reach, predicted) = loop {
            self.count_step(la)?;
            let Some(mut reach) = self.compute_reach_set(&previous, t, true, true, Some(&mut *la))? else {
                let offending_index = la.input.index();
                la.input.seek(la.start_index);
                if let Some(alt) = self.syn_valid_or_sem_invalid_alt(&previous, la) {
                    return Ok(alt);
                }
                return Err(RecognitionError::NoViableAlt {
                    decision,
                    start_index: la.start_index,
                    offending_index,
                    offending_type: t,
                });
            };

            let subsets = reach.conflicting_alt_subsets();
            reach.unique_alt = reach.compute_unique_alt();
            if let Some(alt) = reach.unique_alt {
                break (reach, alt);
            }
            if !exact_mode {
                if let Some(alt) = prediction_mode::resolves_to_just_one_viable_alt(&subsets) {
                    break (reach, alt);
                }
            } else if prediction_mode::all_subsets_conflict(&subsets)
                && prediction_mode::all_subsets_equal(&subsets)
            {
                if let Some(alt) = prediction_mode::get_single_viable_alt(&subsets) {
                    found_exact_ambig = true;
                    break (reach, alt);
                }
            }

            if t == EOF && reach == previous {
                // nothing left to consume; take the lowest surviving alternative
                if let Some(alt) = reach.alts().min() {
                    break (reach, alt);
                }
            }
            previous = reach;
            if t != EOF {
                la.input.consume();
                t = la.input.la(1);
            }
        };

        let stop_index = la.input.index();
        if reach.unique_alt.is_some() {
            log_debug!("d={}: context sensitivity, alt {}", decision, predicted);
            for listener in &mut self.listeners {
                listener.report_context_sensitivity(
                    decision,
                    &reach,
                    la.start_index,
                    stop_index,
                    predicted,
                );
            }
            return Ok(predicted);
        }

        let alts = reach.alts();
        log_debug!(
            "d={}: ambiguity {} (exact={}), choosing {}",
            decision,
            alts,
            found_exact_ambig,
            predicted
        );
        for listener in &mut self.listeners {
            listener.report_ambiguity(
                decision,
                &reach,
                la.start_index,
                stop_index,
                found_exact_ambig,
                &alts,
            );
        }
        Ok(predicted)
    }

    fn count_step(&self, la: &mut Lookahead<'_>) -> RecognitionResult<()> {
        la.steps += 1;
        let max = self.config.max_prediction_steps;
        if max > 0 && la.steps > max {
            return Err(RecognitionError::StepLimitExceeded {
                decision: la.decision,
                max_steps: max,
            });
        }
        Ok(())
    }

    /// Alternative to use when the lookahead runs into an error: one whose
    /// configuration already finished the decision rule, preferring those
    /// whose predicates hold
    fn syn_valid_or_sem_invalid_alt(
        &self,
        configs: &ConfigSet,
        la: &mut Lookahead<'_>,
    ) -> Option<usize> {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        for c in configs {
            if c.semantic.is_none() || c.semantic.eval(la.hooks, la.outer) {
                valid.push(c);
            } else {
                invalid.push(c);
            }
        }
        self.alt_that_finished_decision_entry_rule(&valid)
            .or_else(|| self.alt_that_finished_decision_entry_rule(&invalid))
    }

    fn alt_that_finished_decision_entry_rule(&self, configs: &[&AtnConfig]) -> Option<usize> {
        let alts: AltSet = configs
            .iter()
            .filter(|c| {
                c.reaches_into_outer_context > 0
                    || (self.atn.state(c.state).is_rule_stop()
                        && self.cache.contexts.has_empty_path(c.context))
            })
            .map(|c| c.alt)
            .collect();
        alts.min()
    }

    // ========================================================================
    // DFA construction
    // ========================================================================

    /// Follow the DFA edge of `from` on `symbol`, computing it on a miss
    pub fn step(
        &mut self,
        decision: usize,
        from: DfaStateId,
        symbol: i32,
    ) -> RecognitionResult<DfaStateId> {
        if let Some(to) = self.cache.dfa(decision).edge(from, symbol) {
            self.stats.dfa_hits += 1;
            log_trace!("d={}: {} --{}--> {} (cached)", decision, from, symbol, to);
            return Ok(to);
        }
        self.stats.dfa_misses += 1;
        let to = self.compute_target_state(decision, from, symbol)?;
        log_trace!("d={}: {} --{}--> {}", decision, from, symbol, to);
        Ok(to)
    }

    fn compute_target_state(
        &mut self,
        decision: usize,
        from: DfaStateId,
        t: i32,
    ) -> RecognitionResult<DfaStateId> {
        let configs = self.cache.dfa(decision).state(from).configs.clone();
        let Some(reach) = self.compute_reach_set(&configs, t, false, true, None)? else {
            self.add_edge(decision, from, t, DfaStateId::ERROR);
            return Ok(DfaStateId::ERROR);
        };

        let mut d = DfaState::new(reach);
        if let Some(alt) = d.configs.compute_unique_alt() {
            d.is_accept = true;
            d.configs.unique_alt = Some(alt);
            d.prediction = Some(alt);
        } else if prediction_mode::has_sll_conflict_terminating_prediction(
            self.config.prediction_mode,
            &d.configs,
            &self.atn,
            &mut self.cache.contexts,
        ) {
            let alts = prediction_mode::get_conflicting_alts(&d.configs);
            d.prediction = alts.min();
            d.configs.conflicting_alts = Some(alts);
            d.requires_full_context = true;
            d.is_accept = true;
        }

        if d.is_accept && d.configs.has_semantic_context {
            self.predicate_dfa_state(&mut d, decision);
        }

        let to = self.cache.add_state(decision, d);
        self.add_edge(decision, from, t, to);
        Ok(to)
    }

    fn add_edge(&mut self, decision: usize, from: DfaStateId, t: i32, to: DfaStateId) {
        if t >= EOF && t <= self.atn.max_token_type {
            self.cache.dfa_mut(decision).set_edge(from, t, to);
        }
    }

    fn predicate_dfa_state(&self, d: &mut DfaState, decision: usize) {
        let n_alts = self.atn.decision_state(decision).transitions.len();
        let alts = match (&d.configs.conflicting_alts, d.configs.unique_alt) {
            (Some(conflicting), _) => conflicting.clone(),
            (None, Some(alt)) => AltSet::of(alt),
            (None, None) => return,
        };
        match preds_for_ambig_alts(&alts, &d.configs, n_alts) {
            Some(alt_to_pred) => {
                d.predicates = Some(predicate_predictions(&alts, &alt_to_pred));
                d.prediction = None;
            }
            None => d.prediction = alts.min(),
        }
    }

    // ========================================================================
    // Closure and reach
    // ========================================================================

    /// Start configurations of decision state `p`, closed
    ///
    /// In SLL mode `outer` is ignored and every alternative starts with the
    /// empty context.
    fn compute_start_state(
        &mut self,
        p: usize,
        outer: &[RuleInvocation],
        full_ctx: bool,
        mut la: Option<&mut Lookahead<'_>>,
    ) -> RecognitionResult<ConfigSet> {
        let initial = if full_ctx {
            self.cache.contexts.from_invocation_stack(&self.atn, outer)?
        } else {
            ContextId::EMPTY
        };
        let atn = Arc::clone(&self.atn);
        let mut configs = ConfigSet::new(full_ctx);
        let mut visited = Visited::new();
        for (i, t) in atn.state(p).transitions.iter().enumerate() {
            let c = AtnConfig::new(t.target(), i + 1, initial);
            self.closure_config(
                c,
                &mut configs,
                &mut visited,
                true,
                full_ctx,
                false,
                la.as_deref_mut(),
            )?;
        }
        Ok(configs)
    }

    /// Start configurations of `decision` for the caller stack `outer`
    ///
    /// With `full_ctx == false` this is the set the DFA start state holds.
    /// Predicates are collected but never evaluated.
    pub fn start_configs(
        &mut self,
        decision: usize,
        outer: &[RuleInvocation],
        full_ctx: bool,
    ) -> RecognitionResult<ConfigSet> {
        let p = self.atn.decision_to_state[decision];
        self.compute_start_state(p, outer, full_ctx, None)
    }

    /// Epsilon closure of `configs`
    pub fn closure(&mut self, configs: &ConfigSet, full_ctx: bool) -> RecognitionResult<ConfigSet> {
        let mut out = ConfigSet::new(full_ctx);
        let mut visited = Visited::new();
        for c in configs {
            self.closure_config(c.clone(), &mut out, &mut visited, false, full_ctx, false, None)?;
        }
        Ok(out)
    }

    /// Configurations reached from `configs` by consuming `symbol`, closed;
    /// `None` when nothing matches
    pub fn reach(
        &mut self,
        configs: &ConfigSet,
        symbol: i32,
        full_ctx: bool,
    ) -> RecognitionResult<Option<ConfigSet>> {
        self.compute_reach_set(configs, symbol, full_ctx, false, None)
    }

    /// Move `closure` over `t` and close the result
    ///
    /// With `allow_shortcut`, a moved set that already settles on one
    /// alternative is returned unclosed; prediction stops there anyway.
    fn compute_reach_set(
        &mut self,
        closure: &ConfigSet,
        t: i32,
        full_ctx: bool,
        allow_shortcut: bool,
        mut la: Option<&mut Lookahead<'_>>,
    ) -> RecognitionResult<Option<ConfigSet>> {
        let atn = Arc::clone(&self.atn);
        let min = atn.min_symbol();
        let max = atn.max_token_type;
        let mut intermediate = ConfigSet::new(full_ctx);
        let mut skipped_stop_states = Vec::new();

        for c in closure {
            let state = atn.state(c.state);
            if state.is_rule_stop() {
                if full_ctx || t == EOF {
                    skipped_stop_states.push(c.clone());
                }
                continue;
            }
            for trans in &state.transitions {
                if trans.matches(t, min, max) {
                    intermediate.add(c.moved_to(trans.target()), &mut self.cache.contexts);
                }
            }
        }

        // a set that already predicts one alternative needs no closure
        let shortcut = allow_shortcut
            && skipped_stop_states.is_empty()
            && t != EOF
            && (intermediate.len() == 1 || intermediate.compute_unique_alt().is_some());

        let mut reach = if shortcut {
            intermediate
        } else {
            let mut reach = ConfigSet::new(full_ctx);
            let mut visited = Visited::new();
            let treat_eof_as_epsilon = t == EOF;
            for c in intermediate.iter() {
                self.closure_config(
                    c.clone(),
                    &mut reach,
                    &mut visited,
                    false,
                    full_ctx,
                    treat_eof_as_epsilon,
                    la.as_deref_mut(),
                )?;
            }
            reach
        };

        if t == EOF {
            reach = self.remove_all_configs_not_in_rule_stop_state(reach);
        }

        if !skipped_stop_states.is_empty()
            && (!full_ctx || !prediction_mode::has_config_in_rule_stop_state(&reach, &atn))
        {
            for c in skipped_stop_states {
                reach.add(c, &mut self.cache.contexts);
            }
        }

        if reach.is_empty() {
            return Ok(None);
        }
        Ok(Some(reach))
    }

    fn remove_all_configs_not_in_rule_stop_state(&mut self, configs: ConfigSet) -> ConfigSet {
        if prediction_mode::all_configs_in_rule_stop_states(&configs, &self.atn) {
            return configs;
        }
        let mut result = ConfigSet::new(configs.full_ctx);
        for c in configs.iter() {
            if self.atn.state(c.state).is_rule_stop() {
                result.add(c.clone(), &mut self.cache.contexts);
            }
        }
        result
    }

    /// Close one configuration into `out`
    ///
    /// Iterative depth-first walk; configurations are added in the order a
    /// recursive walk would add them. `depth` counts rule calls below the
    /// decision rule and goes negative when returning past it.
    #[allow(clippy::too_many_arguments)]
    fn closure_config(
        &mut self,
        config: AtnConfig,
        out: &mut ConfigSet,
        visited: &mut Visited,
        collect_predicates: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
        mut la: Option<&mut Lookahead<'_>>,
    ) -> RecognitionResult<()> {
        self.stats.closure_calls += 1;
        let atn = Arc::clone(&self.atn);
        let mut stack: Vec<Frame> = Vec::new();
        self.enter_checking_stop_state(&atn, config, 0, collect_predicates, full_ctx, out, visited, &mut stack)?;

        while let Some(frame) = stack.last_mut() {
            match frame {
                Frame::Pop {
                    config,
                    depth,
                    collect,
                    next,
                } => {
                    if *next >= self.cache.contexts.len_of(config.context) {
                        stack.pop();
                        continue;
                    }
                    let i = *next;
                    *next += 1;
                    let (config, depth, collect) = (config.clone(), *depth, *collect);
                    let return_state = self.cache.contexts.return_state(config.context, i);

                    if return_state == EMPTY_RETURN_STATE {
                        if full_ctx {
                            out.add(
                                config.with_context(config.state, ContextId::EMPTY),
                                &mut self.cache.contexts,
                            );
                        } else {
                            // no context left: chase the follow links
                            self.enter_closure(&atn, config, depth, collect, out, visited, &mut stack)?;
                        }
                        continue;
                    }
                    let parent = self.cache.contexts.parent(config.context, i);
                    let popped = config.with_context(return_state, parent);
                    self.enter_checking_stop_state(
                        &atn,
                        popped,
                        depth - 1,
                        collect,
                        full_ctx,
                        out,
                        visited,
                        &mut stack,
                    )?;
                }
                Frame::Walk {
                    config,
                    depth,
                    collect,
                    next,
                } => {
                    let state = atn.state(config.state);
                    if *next >= state.transitions.len() {
                        stack.pop();
                        continue;
                    }
                    let t = &state.transitions[*next];
                    *next += 1;
                    let (config, depth, collect) = (config.clone(), *depth, *collect);

                    let continue_collecting = !matches!(t, Transition::Action { .. }) && collect;
                    let Some(mut c) = self.epsilon_target(
                        &config,
                        t,
                        continue_collecting,
                        depth == 0,
                        full_ctx,
                        treat_eof_as_epsilon,
                        la.as_deref_mut(),
                    ) else {
                        continue;
                    };

                    let mut new_depth = depth;
                    if state.is_rule_stop() {
                        // fell off the end of the decision rule
                        c.reaches_into_outer_context += 1;
                        out.dips_into_outer_context = true;
                        new_depth -= 1;
                    } else if matches!(t, Transition::Rule { .. }) && new_depth >= 0 {
                        new_depth += 1;
                    }
                    self.enter_checking_stop_state(
                        &atn,
                        c,
                        new_depth,
                        continue_collecting,
                        full_ctx,
                        out,
                        visited,
                        &mut stack,
                    )?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn enter_checking_stop_state(
        &mut self,
        atn: &Atn,
        config: AtnConfig,
        depth: i32,
        collect: bool,
        full_ctx: bool,
        out: &mut ConfigSet,
        visited: &mut Visited,
        stack: &mut Vec<Frame>,
    ) -> RecognitionResult<()> {
        if atn.state(config.state).is_rule_stop() {
            if !config.context.is_empty() {
                self.push_frame(
                    stack,
                    Frame::Pop {
                        config,
                        depth,
                        collect,
                        next: 0,
                    },
                )?;
                return Ok(());
            }
            if full_ctx {
                out.add(config, &mut self.cache.contexts);
                return Ok(());
            }
        }
        self.enter_closure(atn, config, depth, collect, out, visited, stack)
    }

    #[allow(clippy::too_many_arguments)]
    fn enter_closure(
        &mut self,
        atn: &Atn,
        config: AtnConfig,
        depth: i32,
        collect: bool,
        out: &mut ConfigSet,
        visited: &mut Visited,
        stack: &mut Vec<Frame>,
    ) -> RecognitionResult<()> {
        let key = (
            config.state,
            config.alt,
            config.context,
            config.semantic.clone(),
        );
        if !visited.insert(key) {
            return Ok(());
        }
        if !atn.state(config.state).epsilon_only {
            out.add(config.clone(), &mut self.cache.contexts);
        }
        self.push_frame(
            stack,
            Frame::Walk {
                config,
                depth,
                collect,
                next: 0,
            },
        )
    }

    fn push_frame(&self, stack: &mut Vec<Frame>, frame: Frame) -> RecognitionResult<()> {
        if stack.len() >= self.config.max_closure_depth {
            return Err(RecognitionError::ClosureDepthExceeded {
                depth: stack.len() + 1,
                max_depth: self.config.max_closure_depth,
            });
        }
        stack.push(frame);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        t: &Transition,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
        la: Option<&mut Lookahead<'_>>,
    ) -> Option<AtnConfig> {
        match t {
            Transition::Rule {
                target,
                follow_state,
                ..
            } => {
                let context = self.cache.contexts.singleton(config.context, *follow_state);
                Some(config.with_context(*target, context))
            }
            Transition::Precedence { target, precedence } => {
                let collect = collect_predicates && in_context;
                self.predicate_target(
                    config,
                    *target,
                    SemanticContext::Precedence(*precedence),
                    collect,
                    full_ctx,
                    la,
                )
            }
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                let collect = collect_predicates && (!ctx_dependent || in_context);
                self.predicate_target(
                    config,
                    *target,
                    SemanticContext::Predicate {
                        rule_index: *rule_index,
                        pred_index: *pred_index,
                        ctx_dependent: *ctx_dependent,
                    },
                    collect,
                    full_ctx,
                    la,
                )
            }
            Transition::Action { target, .. }
            | Transition::Epsilon { target }
            | Transition::Return { target } => Some(config.moved_to(*target)),
            Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. } => {
                (treat_eof_as_epsilon && t.matches(EOF, 0, 1)).then(|| config.moved_to(*target))
            }
            _ => None,
        }
    }

    fn predicate_target(
        &self,
        config: &AtnConfig,
        target: usize,
        pred: SemanticContext,
        collect: bool,
        full_ctx: bool,
        la: Option<&mut Lookahead<'_>>,
    ) -> Option<AtnConfig> {
        if !collect {
            return Some(config.moved_to(target));
        }
        if !full_ctx {
            let mut c = config.moved_to(target);
            c.semantic = SemanticContext::and(&config.semantic, &pred);
            return Some(c);
        }
        // full context: evaluate now, at the decision's start position
        let Some(la) = la else {
            return Some(config.moved_to(target));
        };
        let current = la.input.index();
        la.input.seek(la.start_index);
        let holds = pred.eval(la.hooks, la.outer);
        la.input.seek(current);
        holds.then(|| config.moved_to(target))
    }
}

/// Evaluate `(predicate, alt)` pairs in order; stop at the first success
/// unless `complete`
fn eval_predicates(preds: &[PredPrediction], la: &mut Lookahead<'_>, complete: bool) -> AltSet {
    let mut alts = AltSet::new();
    for pair in preds {
        if pair.pred.is_none() || pair.pred.eval(la.hooks, la.outer) {
            alts.insert(pair.alt);
            if !complete {
                break;
            }
        }
    }
    alts
}

/// Combined predicate per alternative in `ambig_alts`, or `None` when no
/// alternative is predicated
fn preds_for_ambig_alts(
    ambig_alts: &AltSet,
    configs: &ConfigSet,
    n_alts: usize,
) -> Option<Vec<SemanticContext>> {
    let mut alt_to_pred: Vec<Option<SemanticContext>> = vec![None; n_alts + 1];
    for c in configs {
        if ambig_alts.contains(c.alt) && c.alt <= n_alts {
            alt_to_pred[c.alt] = Some(match &alt_to_pred[c.alt] {
                Some(existing) => SemanticContext::or(existing, &c.semantic),
                None => c.semantic.clone(),
            });
        }
    }
    let resolved: Vec<SemanticContext> = alt_to_pred
        .into_iter()
        .map(|p| p.unwrap_or(SemanticContext::None))
        .collect();
    let n_pred_alts = resolved.iter().skip(1).filter(|p| !p.is_none()).count();
    (n_pred_alts > 0).then_some(resolved)
}

fn predicate_predictions(ambig_alts: &AltSet, alt_to_pred: &[SemanticContext]) -> Vec<PredPrediction> {
    alt_to_pred
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(alt, _)| ambig_alts.contains(*alt))
        .map(|(alt, pred)| PredPrediction {
            pred: pred.clone(),
            alt,
        })
        .collect()
}

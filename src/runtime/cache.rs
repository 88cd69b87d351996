//! Prediction cache: the context store plus one DFA per decision
//!
//! DFA configurations hold [`ContextId`](super::context::ContextId)s, so the
//! store and the DFAs are owned together and cleared together. A cache can
//! outlive the simulator that filled it (`into_cache` / `with_cache`) and be
//! handed to the next one built over the same ATN. It is not synchronized;
//! threads either keep their own cache or lock around the simulator.

use super::config::ConfigSet;
use super::context::ContextStore;
use super::dfa::{Dfa, DfaState, DfaStateId};
use super::graph::Atn;

/// Context store and per-decision DFAs
#[derive(Debug, Clone)]
pub struct PredictionCache {
    /// Interned contexts referenced by DFA configurations
    pub contexts: ContextStore,
    dfas: Vec<Dfa>,
}

impl PredictionCache {
    /// Empty cache with one DFA per decision of `atn`
    pub fn new(atn: &Atn) -> Self {
        Self {
            contexts: ContextStore::new(),
            dfas: atn
                .decision_to_state
                .iter()
                .enumerate()
                .map(|(decision, &state)| Dfa::new(decision, state))
                .collect(),
        }
    }

    /// Whether the cache was built for `atn`
    pub fn fits(&self, atn: &Atn) -> bool {
        self.dfas.len() == atn.num_decisions()
            && self
                .dfas
                .iter()
                .zip(&atn.decision_to_state)
                .all(|(dfa, &s)| dfa.atn_start_state == s)
    }

    /// DFA of `decision`
    #[inline]
    pub fn dfa(&self, decision: usize) -> &Dfa {
        &self.dfas[decision]
    }

    /// Mutable DFA of `decision`
    #[inline]
    pub fn dfa_mut(&mut self, decision: usize) -> &mut Dfa {
        &mut self.dfas[decision]
    }

    /// All DFAs, by decision
    pub fn dfas(&self) -> &[Dfa] {
        &self.dfas
    }

    /// Add `state` to the DFA of `decision`, or find the equal existing one
    #[inline]
    pub fn add_state(&mut self, decision: usize, state: DfaState) -> DfaStateId {
        self.dfas[decision].add_state(state)
    }

    /// The DFA state of `decision` standing for `configs`
    pub fn get_or_create_state(&mut self, decision: usize, configs: ConfigSet) -> DfaStateId {
        self.add_state(decision, DfaState::new(configs))
    }

    /// Total number of DFA states
    pub fn num_states(&self) -> usize {
        self.dfas.iter().map(Dfa::len).sum()
    }

    /// Drop the DFA of `decision`, or everything when `None`
    ///
    /// Clearing one decision keeps the context store, which other DFAs still
    /// reference.
    pub fn clear(&mut self, decision: Option<usize>) {
        match decision {
            Some(d) => {
                if let Some(dfa) = self.dfas.get_mut(d) {
                    dfa.clear();
                }
            }
            None => {
                for dfa in &mut self.dfas {
                    dfa.clear();
                }
                self.contexts.clear();
            }
        }
    }
}

/// Counters kept by the simulators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    /// Closure computations started
    pub closure_calls: u64,
    /// Steps answered by a cached DFA edge
    pub dfa_hits: u64,
    /// Steps that had to compute a reach set
    pub dfa_misses: u64,
    /// Predictions decided without full context
    pub sll_predictions: u64,
    /// Predictions that needed full context
    pub ll_predictions: u64,
}

impl SimulatorStats {
    /// Fraction of steps answered from the DFA
    pub fn hit_rate(&self) -> f64 {
        let total = self.dfa_hits + self.dfa_misses;
        if total > 0 {
            self.dfa_hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

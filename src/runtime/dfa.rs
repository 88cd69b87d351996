//! Per-decision DFA states built lazily from configuration sets

use super::config::ConfigSet;
use super::lexer_action::LexerActionExecutor;
use super::semantic::SemanticContext;
use super::token::INVALID_TYPE;
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a state of one [`Dfa`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DfaStateId(u32);

impl DfaStateId {
    /// Target of edges on which no configuration survives
    pub const ERROR: DfaStateId = DfaStateId(u32::MAX);

    /// Position in the DFA
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the error sentinel
    #[inline]
    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

impl fmt::Display for DfaStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            write!(f, "ERROR")
        } else {
            write!(f, "s{}", self.0)
        }
    }
}

/// A predicate and the alternative it guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredPrediction {
    /// Predicate to evaluate; `None` always holds
    pub pred: SemanticContext,
    /// Alternative predicted when it holds
    pub alt: usize,
}

impl fmt::Display for PredPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.pred, self.alt)
    }
}

/// One DFA state
#[derive(Debug, Clone)]
pub struct DfaState {
    /// Position in the DFA (meaningless until added)
    pub id: DfaStateId,
    /// The configurations the state stands for
    pub configs: ConfigSet,
    edges: Vec<Option<DfaStateId>>,
    /// Whether reaching the state ends prediction
    pub is_accept: bool,
    /// Parser: predicted alternative of an accept state
    pub prediction: Option<usize>,
    /// Lexer: token type of an accept state
    pub token_type: i32,
    /// Lexer: commands of the winning configuration
    pub lexer_executor: Option<Arc<LexerActionExecutor>>,
    /// SLL could not decide; retry with full context
    pub requires_full_context: bool,
    /// Predicates to evaluate in order at an accept state
    pub predicates: Option<Vec<PredPrediction>>,
}

impl DfaState {
    /// Non-accepting state over `configs`
    pub fn new(configs: ConfigSet) -> Self {
        Self {
            id: DfaStateId::ERROR,
            configs,
            edges: Vec::new(),
            is_accept: false,
            prediction: None,
            token_type: INVALID_TYPE,
            lexer_executor: None,
            requires_full_context: false,
            predicates: None,
        }
    }

    /// Cached target for `symbol` (`EOF` included)
    #[inline]
    pub fn edge(&self, symbol: i32) -> Option<DfaStateId> {
        let slot = usize::try_from(symbol + 1).ok()?;
        self.edges.get(slot).copied().flatten()
    }

    fn set_edge(&mut self, symbol: i32, target: DfaStateId) {
        let Ok(slot) = usize::try_from(symbol + 1) else {
            return;
        };
        if slot >= self.edges.len() {
            self.edges.resize(slot + 1, None);
        }
        self.edges[slot] = Some(target);
    }

    /// Computed edges as `(symbol, target)` pairs, ascending
    pub fn edges(&self) -> impl Iterator<Item = (i32, DfaStateId)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(slot, t)| t.map(|t| (slot as i32 - 1, t)))
    }
}

/// The lazily built DFA of one decision (or one lexer mode)
#[derive(Debug, Clone)]
pub struct Dfa {
    /// Decision number
    pub decision: usize,
    /// ATN decision state the DFA simulates
    pub atn_start_state: usize,
    start: Option<DfaStateId>,
    states: Vec<DfaState>,
    index: HashMap<u64, Vec<DfaStateId>>,
}

impl Dfa {
    /// Empty DFA for `decision`
    pub fn new(decision: usize, atn_start_state: usize) -> Self {
        Self {
            decision,
            atn_start_state,
            start: None,
            states: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Start state, once computed
    #[inline]
    pub fn start(&self) -> Option<DfaStateId> {
        self.start
    }

    /// Record the start state
    #[inline]
    pub fn set_start(&mut self, start: DfaStateId) {
        self.start = Some(start);
    }

    /// State by id
    #[inline]
    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id.index()]
    }

    /// All states in creation order
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    /// Number of states
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing has been computed yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Add `state` unless a state with the same configurations exists
    ///
    /// Returns the id of whichever state is in the DFA afterwards. New states
    /// have their configuration set frozen.
    pub fn add_state(&mut self, mut state: DfaState) -> DfaStateId {
        let hash = state.configs.content_hash();
        if let Some(candidates) = self.index.get(&hash) {
            for &id in candidates {
                if self.states[id.index()].configs == state.configs {
                    return id;
                }
            }
        }
        let id = DfaStateId(self.states.len() as u32);
        state.id = id;
        state.configs.freeze();
        self.states.push(state);
        self.index.entry(hash).or_default().push(id);
        id
    }

    /// Cached edge out of `from`
    #[inline]
    pub fn edge(&self, from: DfaStateId, symbol: i32) -> Option<DfaStateId> {
        self.states.get(from.index())?.edge(symbol)
    }

    /// Store an edge
    pub fn set_edge(&mut self, from: DfaStateId, symbol: i32, to: DfaStateId) {
        if let Some(state) = self.states.get_mut(from.index()) {
            state.set_edge(symbol, to);
        }
    }

    /// Forget every state
    pub fn clear(&mut self) {
        self.start = None;
        self.states.clear();
        self.index.clear();
    }
}

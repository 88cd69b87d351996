//! Configurations and configuration sets
//!
//! A configuration is one thread of the simulation: an ATN state, the
//! alternative of the decision it started from, its call-stack context and
//! the predicates collected on the way. A [`ConfigSet`] is the frontier of a
//! simulation step.

use super::alt_set::AltSet;
use super::context::{ContextId, ContextStore};
use super::lexer_action::LexerActionExecutor;
use super::semantic::SemanticContext;
use hashbrown::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One simulation thread
#[derive(Debug, Clone)]
pub struct AtnConfig {
    /// ATN state
    pub state: usize,
    /// Alternative being predicted (1-based)
    pub alt: usize,
    /// Call-stack context
    pub context: ContextId,
    /// Predicates collected so far
    pub semantic: SemanticContext,
    /// How many times the thread returned past the decision rule
    pub reaches_into_outer_context: usize,
    /// Lexer commands collected so far
    pub lexer_executor: Option<Arc<LexerActionExecutor>>,
    /// Whether the thread went through a non-greedy decision
    pub passed_through_non_greedy: bool,
}

impl AtnConfig {
    /// Configuration with no predicates or commands
    pub fn new(state: usize, alt: usize, context: ContextId) -> Self {
        Self {
            state,
            alt,
            context,
            semantic: SemanticContext::None,
            reaches_into_outer_context: 0,
            lexer_executor: None,
            passed_through_non_greedy: false,
        }
    }

    /// Same thread moved to `state`
    #[inline]
    pub fn moved_to(&self, state: usize) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Same thread moved to `state` with a new context
    #[inline]
    pub fn with_context(&self, state: usize, context: ContextId) -> Self {
        Self {
            state,
            context,
            ..self.clone()
        }
    }

    /// Whether the thread carries a predicate
    #[inline]
    pub fn has_semantic_context(&self) -> bool {
        !self.semantic.is_none()
    }
}

impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.context == other.context
            && self.semantic == other.semantic
            && self.passed_through_non_greedy == other.passed_through_non_greedy
            && self.lexer_executor == other.lexer_executor
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
        self.alt.hash(state);
        self.context.hash(state);
        self.semantic.hash(state);
        self.passed_through_non_greedy.hash(state);
        self.lexer_executor.hash(state);
    }
}

impl fmt::Display for AtnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{}", self.state, self.alt, self.context)?;
        if self.has_semantic_context() {
            write!(f, ",{}", self.semantic)?;
        }
        if self.reaches_into_outer_context > 0 {
            write!(f, ",up={}", self.reaches_into_outer_context)?;
        }
        write!(f, ")")
    }
}

/// A set of configurations
///
/// The parser flavor keys configurations by `(state, alt, semantic)` and
/// merges the contexts of configurations that share a key; the lexer
/// flavor (`ordered`) keeps every distinct configuration in insertion order,
/// since the order decides which rule wins a tie. Either way iteration
/// follows insertion order.
#[derive(Debug, Clone)]
pub struct ConfigSet {
    configs: Vec<AtnConfig>,
    merge_lookup: HashMap<(usize, usize, SemanticContext), usize>,
    exact_lookup: HashSet<AtnConfig>,
    ordered: bool,
    /// Built with full-context merging (`$` is not a wildcard)
    pub full_ctx: bool,
    /// Some configuration carries a predicate
    pub has_semantic_context: bool,
    /// Some configuration returned past the decision rule
    pub dips_into_outer_context: bool,
    /// The single alternative of every configuration, once computed
    pub unique_alt: Option<usize>,
    /// Alternatives of the conflict detected in this set
    pub conflicting_alts: Option<AltSet>,
}

impl ConfigSet {
    /// Parser set
    pub fn new(full_ctx: bool) -> Self {
        Self {
            configs: Vec::new(),
            merge_lookup: HashMap::new(),
            exact_lookup: HashSet::new(),
            ordered: false,
            full_ctx,
            has_semantic_context: false,
            dips_into_outer_context: false,
            unique_alt: None,
            conflicting_alts: None,
        }
    }

    /// Lexer set: no context merging, insertion order preserved
    pub fn ordered() -> Self {
        Self {
            ordered: true,
            ..Self::new(false)
        }
    }

    /// Whether this is a lexer set
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Add `config`; returns false if it merged into or duplicated an existing one
    pub fn add(&mut self, config: AtnConfig, store: &mut ContextStore) -> bool {
        if config.has_semantic_context() {
            self.has_semantic_context = true;
        }
        if config.reaches_into_outer_context > 0 {
            self.dips_into_outer_context = true;
        }

        if self.ordered {
            if !self.exact_lookup.insert(config.clone()) {
                return false;
            }
            self.configs.push(config);
            return true;
        }

        let key = (config.state, config.alt, config.semantic.clone());
        if let Some(&i) = self.merge_lookup.get(&key) {
            let existing = &self.configs[i];
            let merged = store.merge(existing.context, config.context, !self.full_ctx);
            let existing = &mut self.configs[i];
            existing.reaches_into_outer_context = existing
                .reaches_into_outer_context
                .max(config.reaches_into_outer_context);
            existing.context = merged;
            return false;
        }
        self.merge_lookup.insert(key, self.configs.len());
        self.configs.push(config);
        true
    }

    /// Drop the lookup tables; the set is read-only from here on
    pub fn freeze(&mut self) {
        self.merge_lookup = HashMap::new();
        self.exact_lookup = HashSet::new();
        self.configs.shrink_to_fit();
    }

    /// Configurations in insertion order
    #[inline]
    pub fn configs(&self) -> &[AtnConfig] {
        &self.configs
    }

    /// Iterate in insertion order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, AtnConfig> {
        self.configs.iter()
    }

    /// Number of configurations
    #[inline]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Every alternative present
    pub fn alts(&self) -> AltSet {
        self.configs.iter().map(|c| c.alt).collect()
    }

    /// The alternative shared by every configuration, if there is one
    pub fn compute_unique_alt(&self) -> Option<usize> {
        let first = self.configs.first()?.alt;
        self.configs
            .iter()
            .all(|c| c.alt == first)
            .then_some(first)
    }

    /// Alternatives grouped by `(state, context)`, in first-seen order
    ///
    /// Two configurations in one group reach the same state with the same
    /// stack but predict different alternatives: a conflict.
    pub fn conflicting_alt_subsets(&self) -> Vec<AltSet> {
        let mut groups: Vec<AltSet> = Vec::new();
        let mut position: HashMap<(usize, ContextId), usize> = HashMap::new();
        for c in &self.configs {
            match position.get(&(c.state, c.context)) {
                Some(&i) => {
                    groups[i].insert(c.alt);
                }
                None => {
                    position.insert((c.state, c.context), groups.len());
                    groups.push(AltSet::of(c.alt));
                }
            }
        }
        groups
    }

    /// Alternatives per state
    pub fn state_to_alts(&self) -> HashMap<usize, AltSet> {
        let mut map: HashMap<usize, AltSet> = HashMap::new();
        for c in &self.configs {
            map.entry(c.state).or_default().insert(c.alt);
        }
        map
    }

    /// Hash of the content, for DFA state deduplication
    pub fn content_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl<'a> IntoIterator for &'a ConfigSet {
    type Item = &'a AtnConfig;
    type IntoIter = std::slice::Iter<'a, AtnConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.iter()
    }
}

impl PartialEq for ConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.configs == other.configs
            && self.full_ctx == other.full_ctx
            && self.unique_alt == other.unique_alt
            && self.conflicting_alts == other.conflicting_alts
            && self.has_semantic_context == other.has_semantic_context
            && self.dips_into_outer_context == other.dips_into_outer_context
    }
}

impl Eq for ConfigSet {}

impl Hash for ConfigSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.configs.hash(state);
        self.full_ctx.hash(state);
        self.unique_alt.hash(state);
        self.conflicting_alts.hash(state);
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.configs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")?;
        if self.has_semantic_context {
            write!(f, ",hasSemanticContext")?;
        }
        if let Some(alt) = self.unique_alt {
            write!(f, ",uniqueAlt={}", alt)?;
        }
        if let Some(alts) = &self.conflicting_alts {
            write!(f, ",conflictingAlts={}", alts)?;
        }
        if self.dips_into_outer_context {
            write!(f, ",dipsIntoOuterContext")?;
        }
        Ok(())
    }
}

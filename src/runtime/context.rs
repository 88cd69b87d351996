//! Hash-consed call-stack contexts
//!
//! A context is a persistent stack of return states. Configurations share
//! them heavily, so every node lives in a [`ContextStore`] and is referred to
//! by a [`ContextId`]: structurally equal nodes always get the same id, which
//! turns context equality into an integer comparison.
//!
//! Nodes come in three shapes:
//!
//! - `Empty`: the stack bottom, written `$`
//! - `Singleton`: one `(parent, return_state)` frame
//! - `Array`: several frames with ascending, distinct return states; an entry
//!   whose return state is [`EMPTY_RETURN_STATE`] stands for `$` and sorts last
//!
//! [`ContextStore::merge`] builds the union of two contexts. In SLL mode the
//! empty context is a wildcard (`$` absorbs everything); in full-context mode
//! `$` is kept as an ordinary entry.

use super::error::{RecognitionError, RecognitionResult};
use super::graph::Atn;
use super::rule_context::RuleInvocation;
use hashbrown::HashMap;
use std::fmt;

/// Return state of the `$` entry of an array context
pub const EMPTY_RETURN_STATE: usize = usize::MAX;

/// Handle to a context interned in a [`ContextStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    /// The empty context `$`
    pub const EMPTY: ContextId = ContextId(0);

    /// Position in the store
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is `$`
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "$")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Structure of one context node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextNode {
    /// Stack bottom
    Empty,
    /// One frame
    Singleton {
        /// Rest of the stack
        parent: ContextId,
        /// State to continue in after the rule returns
        return_state: usize,
    },
    /// Several frames, return states ascending and distinct
    Array {
        /// Rest of the stack per frame; `EMPTY` for the `$` entry
        parents: Box<[ContextId]>,
        /// Return state per frame
        return_states: Box<[usize]>,
    },
}

/// Interning store and merge engine for contexts
#[derive(Debug, Clone)]
pub struct ContextStore {
    nodes: Vec<ContextNode>,
    index: HashMap<ContextNode, ContextId>,
    merge_cache: HashMap<(ContextId, ContextId, bool), ContextId>,
    merge_hits: u64,
    merge_misses: u64,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Create a store holding only `$`
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(ContextNode::Empty, ContextId::EMPTY);
        Self {
            nodes: vec![ContextNode::Empty],
            index,
            merge_cache: HashMap::new(),
            merge_hits: 0,
            merge_misses: 0,
        }
    }

    /// Intern `node`, returning the id of an equal node if there is one
    ///
    /// A `$` singleton becomes `EMPTY` and a one-entry array becomes a
    /// singleton before interning. Nodes that reference unknown parents, or
    /// arrays that are empty, ragged or not strictly ascending, are rejected.
    pub fn add(&mut self, node: ContextNode) -> RecognitionResult<ContextId> {
        self.validate(&node)?;
        Ok(self.intern(node))
    }

    fn validate(&self, node: &ContextNode) -> RecognitionResult<()> {
        let known = |id: ContextId| id.index() < self.nodes.len();
        match node {
            ContextNode::Empty => Ok(()),
            ContextNode::Singleton { parent, .. } if !known(*parent) => Err(
                RecognitionError::invalid_context(format!("unknown parent {}", parent)),
            ),
            ContextNode::Singleton { .. } => Ok(()),
            ContextNode::Array {
                parents,
                return_states,
            } => {
                if return_states.is_empty() {
                    return Err(RecognitionError::invalid_context("empty array"));
                }
                if parents.len() != return_states.len() {
                    return Err(RecognitionError::invalid_context(format!(
                        "{} parents for {} return states",
                        parents.len(),
                        return_states.len()
                    )));
                }
                if return_states.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(RecognitionError::invalid_context(
                        "return states not strictly ascending",
                    ));
                }
                if let Some(parent) = parents.iter().find(|p| !known(**p)) {
                    return Err(RecognitionError::invalid_context(format!(
                        "unknown parent {}",
                        parent
                    )));
                }
                let last = return_states.len() - 1;
                if return_states[last] == EMPTY_RETURN_STATE && !parents[last].is_empty() {
                    return Err(RecognitionError::invalid_context("`$` entry with a parent"));
                }
                Ok(())
            }
        }
    }

    /// Intern a node built by the store itself
    fn intern(&mut self, node: ContextNode) -> ContextId {
        let node = match node {
            ContextNode::Singleton { return_state, .. } if return_state == EMPTY_RETURN_STATE => {
                return ContextId::EMPTY;
            }
            ContextNode::Array {
                parents,
                return_states,
            } => match return_states.len() {
                0 => return ContextId::EMPTY,
                1 => return self.singleton(parents[0], return_states[0]),
                _ => ContextNode::Array {
                    parents,
                    return_states,
                },
            },
            other => other,
        };
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = ContextId(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.index.insert(node, id);
        id
    }

    /// Push `return_state` on top of `parent`
    #[inline]
    pub fn singleton(&mut self, parent: ContextId, return_state: usize) -> ContextId {
        self.intern(ContextNode::Singleton {
            parent,
            return_state,
        })
    }

    /// Structure of `id`
    #[inline]
    pub fn node(&self, id: ContextId) -> &ContextNode {
        &self.nodes[id.index()]
    }

    /// Number of frames at the top of `id` (`$` counts as one)
    pub fn len_of(&self, id: ContextId) -> usize {
        match self.node(id) {
            ContextNode::Empty | ContextNode::Singleton { .. } => 1,
            ContextNode::Array { return_states, .. } => return_states.len(),
        }
    }

    /// Parent of frame `i`
    pub fn parent(&self, id: ContextId, i: usize) -> ContextId {
        match self.node(id) {
            ContextNode::Empty => ContextId::EMPTY,
            ContextNode::Singleton { parent, .. } => *parent,
            ContextNode::Array { parents, .. } => parents[i],
        }
    }

    /// Return state of frame `i`
    pub fn return_state(&self, id: ContextId, i: usize) -> usize {
        match self.node(id) {
            ContextNode::Empty => EMPTY_RETURN_STATE,
            ContextNode::Singleton { return_state, .. } => *return_state,
            ContextNode::Array { return_states, .. } => return_states[i],
        }
    }

    /// Whether one of the represented stacks is empty
    pub fn has_empty_path(&self, id: ContextId) -> bool {
        self.return_state(id, self.len_of(id) - 1) == EMPTY_RETURN_STATE
    }

    fn is_singleton(&self, id: ContextId) -> bool {
        !matches!(self.node(id), ContextNode::Array { .. })
    }

    /// Number of interned nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node but `$` and the merge cache
    ///
    /// Ids handed out earlier become meaningless, so whatever holds them (the
    /// DFA caches) must be cleared too.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Forget memoized merges, keeping every interned node
    pub fn clear_merge_cache(&mut self) {
        self.merge_cache.clear();
    }

    /// Number of memoized merges
    pub fn merge_cache_len(&self) -> usize {
        self.merge_cache.len()
    }

    /// Merge cache statistics: (hits, misses, hit rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let total = self.merge_hits + self.merge_misses;
        let rate = if total > 0 {
            self.merge_hits as f64 / total as f64
        } else {
            0.0
        };
        (self.merge_hits, self.merge_misses, rate)
    }

    /// Context for the caller's rule-invocation stack
    ///
    /// `stack` is outermost first. The start rule frame contributes nothing;
    /// every other frame pushes the follow state of its call site.
    pub fn from_invocation_stack(
        &mut self,
        atn: &Atn,
        stack: &[RuleInvocation],
    ) -> RecognitionResult<ContextId> {
        let mut ctx = ContextId::EMPTY;
        for frame in stack {
            if let Some(invoking_state) = frame.invoking_state {
                let follow = atn.follow_state(invoking_state)?;
                ctx = self.singleton(ctx, follow);
            }
        }
        Ok(ctx)
    }

    /// Union of `a` and `b`
    ///
    /// With `root_is_wildcard` (SLL) `$` absorbs the other side; otherwise it
    /// is kept as a separate `$` entry.
    pub fn merge(&mut self, a: ContextId, b: ContextId, root_is_wildcard: bool) -> ContextId {
        if a == b {
            return a;
        }
        let key = (a.min(b), a.max(b), root_is_wildcard);
        if let Some(&cached) = self.merge_cache.get(&key) {
            self.merge_hits += 1;
            return cached;
        }
        self.merge_misses += 1;

        let merged = if self.is_singleton(a) && self.is_singleton(b) {
            self.merge_singletons(a, b, root_is_wildcard)
        } else if root_is_wildcard && (a.is_empty() || b.is_empty()) {
            ContextId::EMPTY
        } else {
            self.merge_arrays(a, b, root_is_wildcard)
        };
        self.merge_cache.insert(key, merged);
        merged
    }

    fn merge_singletons(&mut self, a: ContextId, b: ContextId, root_is_wildcard: bool) -> ContextId {
        if let Some(root) = self.merge_root(a, b, root_is_wildcard) {
            return root;
        }
        let (a_parent, a_rs) = (self.parent(a, 0), self.return_state(a, 0));
        let (b_parent, b_rs) = (self.parent(b, 0), self.return_state(b, 0));

        if a_rs == b_rs {
            let parent = self.merge(a_parent, b_parent, root_is_wildcard);
            if parent == a_parent {
                return a;
            }
            if parent == b_parent {
                return b;
            }
            return self.singleton(parent, a_rs);
        }

        let (first, second) = if a_rs < b_rs {
            ((a_parent, a_rs), (b_parent, b_rs))
        } else {
            ((b_parent, b_rs), (a_parent, a_rs))
        };
        self.intern(ContextNode::Array {
            parents: vec![first.0, second.0].into(),
            return_states: vec![first.1, second.1].into(),
        })
    }

    /// Merges involving `$` on at least one side, or `None`
    fn merge_root(&mut self, a: ContextId, b: ContextId, root_is_wildcard: bool) -> Option<ContextId> {
        if root_is_wildcard {
            if a.is_empty() || b.is_empty() {
                return Some(ContextId::EMPTY);
            }
            return None;
        }
        let other = match (a.is_empty(), b.is_empty()) {
            (true, true) => return Some(ContextId::EMPTY),
            (true, false) => b,
            (false, true) => a,
            (false, false) => return None,
        };
        let parent = self.parent(other, 0);
        let return_state = self.return_state(other, 0);
        Some(self.intern(ContextNode::Array {
            parents: vec![parent, ContextId::EMPTY].into(),
            return_states: vec![return_state, EMPTY_RETURN_STATE].into(),
        }))
    }

    fn merge_arrays(&mut self, a: ContextId, b: ContextId, root_is_wildcard: bool) -> ContextId {
        let a_len = self.len_of(a);
        let b_len = self.len_of(b);
        let mut parents = Vec::with_capacity(a_len + b_len);
        let mut return_states = Vec::with_capacity(a_len + b_len);

        let (mut i, mut j) = (0, 0);
        while i < a_len && j < b_len {
            let (a_parent, a_rs) = (self.parent(a, i), self.return_state(a, i));
            let (b_parent, b_rs) = (self.parent(b, j), self.return_state(b, j));
            if a_rs == b_rs {
                let parent = if a_parent == b_parent {
                    a_parent
                } else {
                    self.merge(a_parent, b_parent, root_is_wildcard)
                };
                parents.push(parent);
                return_states.push(a_rs);
                i += 1;
                j += 1;
            } else if a_rs < b_rs {
                parents.push(a_parent);
                return_states.push(a_rs);
                i += 1;
            } else {
                parents.push(b_parent);
                return_states.push(b_rs);
                j += 1;
            }
        }
        for k in i..a_len {
            parents.push(self.parent(a, k));
            return_states.push(self.return_state(a, k));
        }
        for k in j..b_len {
            parents.push(self.parent(b, k));
            return_states.push(self.return_state(b, k));
        }

        self.intern(ContextNode::Array {
            parents: parents.into(),
            return_states: return_states.into(),
        })
    }

    /// Every stack `id` represents, top frame first, `$` omitted
    ///
    /// Exponential in the worst case; meant for diagnostics and tests.
    pub fn paths(&self, id: ContextId) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        for i in 0..self.len_of(id) {
            let return_state = self.return_state(id, i);
            if return_state == EMPTY_RETURN_STATE {
                out.push(Vec::new());
                continue;
            }
            for tail in self.paths(self.parent(id, i)) {
                let mut path = Vec::with_capacity(tail.len() + 1);
                path.push(return_state);
                path.extend(tail);
                out.push(path);
            }
        }
        out
    }

    /// Compact rendering such as `[12 $]` or `[7 [12 $]]`
    pub fn describe(&self, id: ContextId) -> String {
        match self.node(id) {
            ContextNode::Empty => "$".to_string(),
            _ => {
                let frames: Vec<String> = (0..self.len_of(id))
                    .map(|i| {
                        let rs = self.return_state(id, i);
                        let parent = self.parent(id, i);
                        if rs == EMPTY_RETURN_STATE {
                            "$".to_string()
                        } else if parent.is_empty() {
                            rs.to_string()
                        } else {
                            format!("{} {}", rs, self.describe(parent))
                        }
                    })
                    .collect();
                format!("[{}]", frames.join(", "))
            }
        }
    }
}

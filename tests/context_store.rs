//! Property-based tests for the hash-consed context store
//!
//! Contexts are built from random call stacks; merging must behave as set
//! union on the represented stacks and interning must make structurally
//! equal contexts share an id.

use atnsim::runtime::{ContextId, ContextStore};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Stacks of return states, top frame first
fn stacks() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..6, 0..4), 1..4)
}

fn push_stack(store: &mut ContextStore, stack: &[usize]) -> ContextId {
    stack
        .iter()
        .rev()
        .fold(ContextId::EMPTY, |ctx, &rs| store.singleton(ctx, rs))
}

/// Full-context union of all `stacks`
fn build(store: &mut ContextStore, stacks: &[Vec<usize>], wildcard: bool) -> ContextId {
    let mut ctx = push_stack(store, &stacks[0]);
    for stack in &stacks[1..] {
        let next = push_stack(store, stack);
        ctx = store.merge(ctx, next, wildcard);
    }
    ctx
}

fn path_set(store: &ContextStore, id: ContextId) -> BTreeSet<Vec<usize>> {
    store.paths(id).into_iter().collect()
}

// =============================================================================
// Interning
// =============================================================================

proptest! {
    /// Building the same stack twice yields the same id
    #[test]
    fn test_hash_consing_identity(stack in prop::collection::vec(0usize..10, 0..6)) {
        let mut store = ContextStore::new();
        let a = push_stack(&mut store, &stack);
        let nodes = store.node_count();
        let b = push_stack(&mut store, &stack);
        prop_assert_eq!(a, b);
        prop_assert_eq!(store.node_count(), nodes);
    }

    /// The paths of a single stack are exactly that stack
    #[test]
    fn test_single_stack_paths(stack in prop::collection::vec(0usize..10, 0..6)) {
        let mut store = ContextStore::new();
        let id = push_stack(&mut store, &stack);
        prop_assert_eq!(store.paths(id), vec![stack]);
    }
}

// =============================================================================
// Merge
// =============================================================================

proptest! {
    /// merge(a, b) == merge(b, a)
    #[test]
    fn test_merge_commutative(left in stacks(), right in stacks(), wildcard in any::<bool>()) {
        let mut store = ContextStore::new();
        let a = build(&mut store, &left, wildcard);
        let b = build(&mut store, &right, wildcard);
        let ab = store.merge(a, b, wildcard);

        // a fresh store rules out the merge cache answering for us
        let mut fresh = ContextStore::new();
        let a2 = build(&mut fresh, &left, wildcard);
        let b2 = build(&mut fresh, &right, wildcard);
        let ba = fresh.merge(b2, a2, wildcard);
        prop_assert_eq!(path_set(&store, ab), path_set(&fresh, ba));

        let ba_same_store = store.merge(b, a, wildcard);
        prop_assert_eq!(ab, ba_same_store);
    }

    /// merge(a, a) == a
    #[test]
    fn test_merge_idempotent(left in stacks(), wildcard in any::<bool>()) {
        let mut store = ContextStore::new();
        let a = build(&mut store, &left, wildcard);
        prop_assert_eq!(store.merge(a, a, wildcard), a);
    }

    /// Without the wildcard root, merge is union of the represented stacks
    #[test]
    fn test_full_context_merge_is_union(left in stacks(), right in stacks()) {
        let mut store = ContextStore::new();
        let a = build(&mut store, &left, false);
        let b = build(&mut store, &right, false);
        let merged = store.merge(a, b, false);

        let expected: BTreeSet<Vec<usize>> = left.iter().chain(right.iter()).cloned().collect();
        prop_assert_eq!(path_set(&store, merged), expected);
    }

    /// Structurally equal merges intern to the same id
    #[test]
    fn test_merge_result_is_interned(left in stacks(), right in stacks()) {
        let mut store = ContextStore::new();
        let a = build(&mut store, &left, false);
        let b = build(&mut store, &right, false);
        let merged = store.merge(a, b, false);
        let rebuilt = build(&mut store, &[left, right].concat(), false);
        prop_assert_eq!(merged, rebuilt);
    }

    /// With the wildcard root, an empty stack absorbs everything
    #[test]
    fn test_wildcard_root_absorbs(left in stacks()) {
        let mut store = ContextStore::new();
        let a = build(&mut store, &left, true);
        prop_assert_eq!(store.merge(a, ContextId::EMPTY, true), ContextId::EMPTY);
        prop_assert_eq!(store.merge(ContextId::EMPTY, a, true), ContextId::EMPTY);
    }
}

#[test]
fn test_merge_cache_is_consulted() {
    let mut store = ContextStore::new();
    let a = push_stack(&mut store, &[1, 2]);
    let b = push_stack(&mut store, &[3]);
    let first = store.merge(a, b, false);
    let (hits, _, _) = store.stats();
    let second = store.merge(b, a, false);
    assert_eq!(first, second);
    assert_eq!(store.stats().0, hits + 1);
}

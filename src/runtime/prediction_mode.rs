//! Prediction modes and the conflict analysis they rely on
//!
//! SLL prediction stops as soon as the conflicting alternative subsets of a
//! reach set can no longer be told apart by more lookahead. Full-context
//! prediction keeps going until one alternative remains or, in exact mode,
//! until every subset conflicts in the same way.

use super::alt_set::AltSet;
use super::config::{AtnConfig, ConfigSet};
use super::context::ContextStore;
use super::graph::Atn;
use super::semantic::SemanticContext;
use serde::{Deserialize, Serialize};

/// How hard the parser simulator tries to resolve a decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionMode {
    /// Local context only; conflicts resolve to the minimum alternative
    Sll,
    /// SLL first, full context on conflict
    #[default]
    Ll,
    /// Like `Ll` but keeps consuming until an ambiguity is exact
    LlExactAmbigDetection,
}

/// Whether SLL prediction should stop at `configs`
///
/// True when every configuration finished the decision rule, or when some
/// subset conflicts and no state is predicted by a single alternative. In
/// pure SLL mode predicates are ignored for this check.
pub fn has_sll_conflict_terminating_prediction(
    mode: PredictionMode,
    configs: &ConfigSet,
    atn: &Atn,
    store: &mut ContextStore,
) -> bool {
    if all_configs_in_rule_stop_states(configs, atn) {
        return true;
    }

    let stripped;
    let configs = if mode == PredictionMode::Sll && configs.has_semantic_context {
        let mut dup = ConfigSet::new(configs.full_ctx);
        for c in configs {
            dup.add(
                AtnConfig {
                    semantic: SemanticContext::None,
                    ..c.clone()
                },
                store,
            );
        }
        stripped = dup;
        &stripped
    } else {
        configs
    };

    let subsets = configs.conflicting_alt_subsets();
    has_conflicting_alt_set(&subsets) && !has_state_associated_with_one_alt(configs)
}

/// Whether some configuration sits in a rule stop state
pub fn has_config_in_rule_stop_state(configs: &ConfigSet, atn: &Atn) -> bool {
    configs.iter().any(|c| atn.state(c.state).is_rule_stop())
}

/// Whether every configuration sits in a rule stop state
pub fn all_configs_in_rule_stop_states(configs: &ConfigSet, atn: &Atn) -> bool {
    configs.iter().all(|c| atn.state(c.state).is_rule_stop())
}

/// The alternative chosen when each subset votes for its minimum, if the
/// votes agree
pub fn resolves_to_just_one_viable_alt(subsets: &[AltSet]) -> Option<usize> {
    get_single_viable_alt(subsets)
}

/// Whether every subset has more than one alternative
pub fn all_subsets_conflict(subsets: &[AltSet]) -> bool {
    !has_non_conflicting_alt_set(subsets)
}

/// Whether every subset is the same set
pub fn all_subsets_equal(subsets: &[AltSet]) -> bool {
    match subsets.split_first() {
        Some((first, rest)) => rest.iter().all(|s| s == first),
        None => true,
    }
}

/// Whether some subset has exactly one alternative
pub fn has_non_conflicting_alt_set(subsets: &[AltSet]) -> bool {
    subsets.iter().any(|s| s.len() == 1)
}

/// Whether some subset has more than one alternative
pub fn has_conflicting_alt_set(subsets: &[AltSet]) -> bool {
    subsets.iter().any(|s| s.len() > 1)
}

/// The only alternative across all subsets, if there is exactly one
pub fn get_unique_alt(subsets: &[AltSet]) -> Option<usize> {
    let all = get_alts(subsets);
    if all.len() == 1 {
        all.min()
    } else {
        None
    }
}

/// Union of the subsets
pub fn get_alts(subsets: &[AltSet]) -> AltSet {
    let mut all = AltSet::new();
    for s in subsets {
        all.union_with(s);
    }
    all
}

/// Union of the conflicting subsets of `configs`
pub fn get_conflicting_alts(configs: &ConfigSet) -> AltSet {
    get_alts(&configs.conflicting_alt_subsets())
}

/// The minimum alternative, if every subset's minimum is the same
pub fn get_single_viable_alt(subsets: &[AltSet]) -> Option<usize> {
    let mut viable = AltSet::new();
    for s in subsets {
        if let Some(min) = s.min() {
            viable.insert(min);
            if viable.len() > 1 {
                return None;
            }
        }
    }
    viable.min()
}

/// Whether some state is reached by a single alternative only
pub fn has_state_associated_with_one_alt(configs: &ConfigSet) -> bool {
    configs.state_to_alts().values().any(|alts| alts.len() == 1)
}

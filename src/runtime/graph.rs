//! The automaton graph (ATN)
//!
//! An [`Atn`] is produced once, by an external producer or by
//! [`AtnBuilder`](super::builder::AtnBuilder), and is read-only afterwards.
//! It is shared between recognizers through an `Arc`.

use super::error::{RecognitionError, RecognitionResult};
use super::lexer_action::LexerAction;
use super::state::{AtnState, StateKind};
use super::transition::Transition;
use serde::{Deserialize, Serialize};

/// Which recognizer the graph drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtnKind {
    /// Character-level graph with token rules and modes
    Lexer,
    /// Token-level graph with parser rules
    Parser,
}

/// A complete automaton graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atn {
    /// Lexer or parser
    pub kind: AtnKind,
    /// Largest symbol of the vocabulary (token type or code point)
    pub max_token_type: i32,
    /// All states; `states[i].id == i`
    pub states: Vec<AtnState>,
    /// Decision number to decision state
    pub decision_to_state: Vec<usize>,
    /// Rule index to rule start state
    pub rule_to_start: Vec<usize>,
    /// Rule index to rule stop state
    pub rule_to_stop: Vec<usize>,
    /// Rule names, for diagnostics
    #[serde(default)]
    pub rule_names: Vec<String>,
    /// Lexer rule index to emitted token type (`INVALID_TYPE` for fragments)
    #[serde(default)]
    pub rule_to_token_type: Vec<i32>,
    /// Lexer mode to its tokens-start state
    #[serde(default)]
    pub mode_to_start: Vec<usize>,
    /// Lexer mode names
    #[serde(default)]
    pub mode_names: Vec<String>,
    /// Lexer commands referenced by `Action` transitions
    #[serde(default)]
    pub lexer_actions: Vec<LexerAction>,
}

impl Atn {
    /// Create an empty graph
    pub fn new(kind: AtnKind, max_token_type: i32) -> Self {
        Self {
            kind,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start: Vec::new(),
            rule_to_stop: Vec::new(),
            rule_names: Vec::new(),
            rule_to_token_type: Vec::new(),
            mode_to_start: Vec::new(),
            mode_names: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    /// State by id
    #[inline]
    pub fn state(&self, id: usize) -> &AtnState {
        &self.states[id]
    }

    /// Decision state of `decision`
    #[inline]
    pub fn decision_state(&self, decision: usize) -> &AtnState {
        &self.states[self.decision_to_state[decision]]
    }

    /// Number of decisions
    #[inline]
    pub fn num_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    /// Number of rules
    #[inline]
    pub fn num_rules(&self) -> usize {
        self.rule_to_start.len()
    }

    /// Index of the rule called `name`
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rule_names.iter().position(|n| n == name)
    }

    /// Follow state of the call made from `invoking_state`
    ///
    /// The invoking state's first transition must be a `Rule` transition.
    pub fn follow_state(&self, invoking_state: usize) -> RecognitionResult<usize> {
        match self.states.get(invoking_state).and_then(|s| s.transitions.first()) {
            Some(Transition::Rule { follow_state, .. }) => Ok(*follow_state),
            _ => Err(RecognitionError::invalid_atn(format!(
                "state {} does not invoke a rule",
                invoking_state
            ))),
        }
    }

    /// Lower bound of the vocabulary for `matches`
    #[inline]
    pub fn min_symbol(&self) -> i32 {
        match self.kind {
            AtnKind::Lexer => super::token::MIN_CHAR_VALUE,
            AtnKind::Parser => super::token::MIN_USER_TOKEN_TYPE,
        }
    }

    /// Validate the graph and derive the computed fields
    ///
    /// Checks every state, rule, decision and mode index, then rebuilds the
    /// follow links (`Return` transitions out of rule stop states, one per
    /// `Rule` transition, in state order) and `epsilon_only`. Calling it again
    /// is harmless.
    pub fn link(&mut self) -> RecognitionResult<()> {
        let n = self.states.len();
        if self.rule_to_start.len() != self.rule_to_stop.len() {
            return Err(RecognitionError::invalid_atn(
                "rule start and stop tables differ in length",
            ));
        }

        for (i, state) in self.states.iter_mut().enumerate() {
            if state.id != i {
                return Err(RecognitionError::invalid_atn(format!(
                    "state at position {} has id {}",
                    i, state.id
                )));
            }
            if state.kind == StateKind::RuleStop {
                state
                    .transitions
                    .retain(|t| !matches!(t, Transition::Return { .. }));
            }
        }

        for (rule, (&start, &stop)) in self
            .rule_to_start
            .iter()
            .zip(self.rule_to_stop.iter())
            .enumerate()
        {
            self.expect_kind(start, StateKind::RuleStart, "rule start")?;
            self.expect_kind(stop, StateKind::RuleStop, "rule stop")?;
            if self.states[start].rule_index != rule || self.states[stop].rule_index != rule {
                return Err(RecognitionError::invalid_atn(format!(
                    "rule {} start/stop states belong to another rule",
                    rule
                )));
            }
        }

        let mut follow_links = Vec::new();
        for state in &self.states {
            for t in &state.transitions {
                if t.target() >= n {
                    return Err(RecognitionError::invalid_atn(format!(
                        "state {} has a transition to missing state {}",
                        state.id,
                        t.target()
                    )));
                }
                match t {
                    Transition::Rule {
                        target,
                        rule_index,
                        follow_state,
                        ..
                    } => {
                        if *rule_index >= self.rule_to_stop.len()
                            || self.rule_to_start[*rule_index] != *target
                        {
                            return Err(RecognitionError::invalid_atn(format!(
                                "state {} calls rule {} through state {}",
                                state.id, rule_index, target
                            )));
                        }
                        if *follow_state >= n {
                            return Err(RecognitionError::invalid_atn(format!(
                                "state {} has missing follow state {}",
                                state.id, follow_state
                            )));
                        }
                        follow_links.push((self.rule_to_stop[*rule_index], *follow_state));
                    }
                    Transition::Precedence { .. } if self.kind == AtnKind::Lexer => {
                        return Err(RecognitionError::invalid_atn(
                            "precedence predicates are not supported in lexers",
                        ));
                    }
                    Transition::Action { action_index, .. }
                        if self.kind == AtnKind::Lexer
                            && *action_index >= self.lexer_actions.len() =>
                    {
                        return Err(RecognitionError::invalid_atn(format!(
                            "state {} references missing lexer action {}",
                            state.id, action_index
                        )));
                    }
                    _ => {}
                }
            }
        }
        for (stop, follow) in follow_links {
            self.states[stop]
                .transitions
                .push(Transition::Return { target: follow });
        }

        for (decision, &s) in self.decision_to_state.iter().enumerate() {
            if s >= n || self.states[s].decision != Some(decision) {
                return Err(RecognitionError::invalid_atn(format!(
                    "decision {} does not point at its decision state",
                    decision
                )));
            }
        }

        if self.kind == AtnKind::Lexer {
            if self.rule_to_token_type.len() != self.rule_to_start.len() {
                return Err(RecognitionError::invalid_atn(
                    "lexer rule to token type table has the wrong length",
                ));
            }
            for &start in &self.mode_to_start {
                self.expect_kind(start, StateKind::TokensStart, "mode start")?;
            }
        }

        for state in &mut self.states {
            state.refresh_epsilon_only();
        }
        Ok(())
    }

    fn expect_kind(&self, id: usize, kind: StateKind, what: &str) -> RecognitionResult<()> {
        match self.states.get(id) {
            Some(s) if s.kind == kind => Ok(()),
            _ => Err(RecognitionError::invalid_atn(format!(
                "{} {} is not a {:?} state",
                what, id, kind
            ))),
        }
    }

    /// Serialize to JSON
    #[inline]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON and [`link`](Self::link)
    pub fn from_json(s: &str) -> RecognitionResult<Self> {
        let mut atn: Atn = serde_json::from_str(s)
            .map_err(|e| RecognitionError::invalid_atn(e.to_string()))?;
        atn.link()?;
        Ok(atn)
    }

    /// One-line description of a state, for diagnostics
    pub fn describe_state(&self, id: usize) -> String {
        let state = &self.states[id];
        match self.rule_names.get(state.rule_index) {
            Some(name) => format!("{} ({})", state, name),
            None => state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// rule 0: start -> 'x' -> stop, called from rule 1
    fn two_rules() -> Atn {
        let mut atn = Atn::new(AtnKind::Parser, 3);
        for (id, rule, kind) in [
            (0, 0, StateKind::RuleStart),
            (1, 0, StateKind::Basic),
            (2, 0, StateKind::RuleStop),
            (3, 1, StateKind::RuleStart),
            (4, 1, StateKind::Basic),
            (5, 1, StateKind::Basic),
            (6, 1, StateKind::RuleStop),
        ] {
            atn.states.push(AtnState::new(id, rule, kind));
        }
        atn.states[0].add_transition(Transition::Epsilon { target: 1 });
        atn.states[1].add_transition(Transition::Atom {
            target: 2,
            label: 1,
        });
        atn.states[3].add_transition(Transition::Epsilon { target: 4 });
        atn.states[4].add_transition(Transition::Rule {
            target: 0,
            rule_index: 0,
            precedence: 0,
            follow_state: 5,
        });
        atn.states[5].add_transition(Transition::Epsilon { target: 6 });
        atn.rule_to_start = vec![0, 3];
        atn.rule_to_stop = vec![2, 6];
        atn.rule_names = vec!["x".into(), "top".into()];
        atn
    }

    #[test]
    fn test_link_derives_follow_links() {
        let mut atn = two_rules();
        atn.link().unwrap();
        assert_eq!(atn.states[2].transitions, vec![Transition::Return { target: 5 }]);
        assert!(atn.states[2].epsilon_only);
        assert!(!atn.states[1].epsilon_only);
        assert!(!atn.states[6].epsilon_only);

        // idempotent
        atn.link().unwrap();
        assert_eq!(atn.states[2].transitions.len(), 1);
    }

    #[test]
    fn test_link_rejects_bad_target() {
        let mut atn = two_rules();
        atn.states[1].transitions[0] = Transition::Atom {
            target: 99,
            label: 1,
        };
        assert!(matches!(
            atn.link(),
            Err(RecognitionError::InvalidAtn { .. })
        ));
    }

    #[test]
    fn test_link_rejects_dangling_decision() {
        let mut atn = two_rules();
        atn.decision_to_state = vec![4];
        assert!(atn.link().is_err());
    }

    #[test]
    fn test_json_round_trip_relinks() {
        let mut atn = two_rules();
        atn.link().unwrap();
        let json = atn.to_json().unwrap();
        let back = Atn::from_json(&json).unwrap();
        assert_eq!(back, atn);
        assert_eq!(back.rule_index("top"), Some(1));
        assert_eq!(back.follow_state(4).unwrap(), 5);
        assert!(back.follow_state(1).is_err());
    }

    #[test]
    fn test_from_json_reports_syntax_errors() {
        assert!(matches!(
            Atn::from_json("{ not json"),
            Err(RecognitionError::InvalidAtn { .. })
        ));
    }
}

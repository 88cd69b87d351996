//! Builder DSL for automaton graphs
//!
//! Grammars are described with [`Element`] trees and laid out into ATN
//! states the way the ANTLR tool does it: blocks get a block start/end pair,
//! `*` loops an entry/back/end triple around a star block, `+` loops a plus
//! block with a loop-back decision, and every lexer mode gets a tokens-start
//! state whose alternatives are the mode's token rules in declaration order.
//!
//! # Example
//!
//! ```rust
//! use atnsim::runtime::builder::*;
//!
//! const INT: i32 = 1;
//! const PLUS: i32 = 2;
//!
//! // s : expr EOF ;  expr : INT ('+' expr)* ;
//! let atn = AtnBuilder::parser(2)
//!     .rule("s", seq(vec![rule("expr"), eof()]))
//!     .rule("expr", seq(vec![tok(INT), star(seq(vec![tok(PLUS), rule("expr")]))]))
//!     .build()
//!     .unwrap();
//! assert_eq!(atn.num_rules(), 2);
//! ```

use super::error::{RecognitionError, RecognitionResult};
use super::graph::{Atn, AtnKind};
use super::interval_set::IntervalSet;
use super::lexer_action::LexerAction;
use super::state::{AtnState, StateKind};
use super::token::{EOF, INVALID_TYPE, MAX_CHAR_VALUE};
use super::transition::Transition;
use hashbrown::HashMap;

/// A grammar element
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// One symbol (token type or code point)
    Symbol(i32),
    /// Inclusive symbol range
    Range(i32, i32),
    /// Any symbol in the set
    Set(IntervalSet),
    /// Any symbol not in the set
    NotSet(IntervalSet),
    /// Any symbol
    Wildcard,
    /// Rule reference with a precedence argument (0 for plain calls)
    RuleRef(String, i32),
    /// Elements in order
    Seq(Vec<Element>),
    /// Alternatives, numbered from 1 in order
    Alt(Vec<Element>),
    /// `x?` (`greedy == false` for `x??`)
    Optional(Box<Element>, bool),
    /// `x*` (`greedy == false` for `x*?`)
    Star(Box<Element>, bool),
    /// `x+` (`greedy == false` for `x+?`)
    Plus(Box<Element>, bool),
    /// Semantic predicate
    Predicate {
        /// Predicate index
        pred_index: usize,
        /// Whether the predicate reads the caller's context
        ctx_dependent: bool,
    },
    /// Precedence predicate
    Precedence(i32),
    /// Embedded action; a custom command in lexer rules
    Action(usize),
    /// Lexer command
    Command(LexerAction),
}

/// Match token type `t`
pub fn tok(t: i32) -> Element {
    Element::Symbol(t)
}

/// Match end of input
pub fn eof() -> Element {
    Element::Symbol(EOF)
}

/// Match one character
pub fn ch(c: char) -> Element {
    Element::Symbol(c as i32)
}

/// Match a literal string, one character at a time
pub fn lit(s: &str) -> Element {
    let mut chars: Vec<Element> = s.chars().map(ch).collect();
    if chars.len() == 1 {
        return chars.remove(0);
    }
    Element::Seq(chars)
}

/// Match a character range
pub fn char_range(from: char, to: char) -> Element {
    Element::Range(from as i32, to as i32)
}

/// Match a symbol range
pub fn range(from: i32, to: i32) -> Element {
    Element::Range(from, to)
}

/// Match any of `symbols`
pub fn set(symbols: impl IntoIterator<Item = i32>) -> Element {
    Element::Set(symbols.into_iter().collect())
}

/// Match anything but `symbols`
pub fn not_set(symbols: impl IntoIterator<Item = i32>) -> Element {
    Element::NotSet(symbols.into_iter().collect())
}

/// Match any symbol
pub fn any() -> Element {
    Element::Wildcard
}

/// Invoke rule `name`
pub fn rule(name: &str) -> Element {
    Element::RuleRef(name.to_string(), 0)
}

/// Invoke rule `name` with a precedence argument
pub fn rule_prec(name: &str, precedence: i32) -> Element {
    Element::RuleRef(name.to_string(), precedence)
}

/// Sequence
pub fn seq(items: Vec<Element>) -> Element {
    Element::Seq(items)
}

/// Alternation
pub fn alt(items: Vec<Element>) -> Element {
    Element::Alt(items)
}

/// `x?`
pub fn opt(e: Element) -> Element {
    Element::Optional(Box::new(e), true)
}

/// `x*`
pub fn star(e: Element) -> Element {
    Element::Star(Box::new(e), true)
}

/// `x+`
pub fn plus(e: Element) -> Element {
    Element::Plus(Box::new(e), true)
}

/// `x??`
pub fn opt_lazy(e: Element) -> Element {
    Element::Optional(Box::new(e), false)
}

/// `x*?`
pub fn star_lazy(e: Element) -> Element {
    Element::Star(Box::new(e), false)
}

/// `x+?`
pub fn plus_lazy(e: Element) -> Element {
    Element::Plus(Box::new(e), false)
}

/// Context-independent predicate
pub fn pred(pred_index: usize) -> Element {
    Element::Predicate {
        pred_index,
        ctx_dependent: false,
    }
}

/// Context-dependent predicate
pub fn ctx_pred(pred_index: usize) -> Element {
    Element::Predicate {
        pred_index,
        ctx_dependent: true,
    }
}

/// Precedence predicate
pub fn precpred(precedence: i32) -> Element {
    Element::Precedence(precedence)
}

/// Embedded action
pub fn action(action_index: usize) -> Element {
    Element::Action(action_index)
}

/// Lexer command
pub fn command(action: LexerAction) -> Element {
    Element::Command(action)
}

#[derive(Debug, Clone)]
struct RuleDef {
    name: String,
    body: Element,
    token_type: i32,
    mode: usize,
    fragment: bool,
}

/// Builds an [`Atn`] from rule definitions
#[derive(Debug, Clone)]
pub struct AtnBuilder {
    kind: AtnKind,
    max_token_type: i32,
    rules: Vec<RuleDef>,
    modes: Vec<String>,
    current_mode: usize,
}

impl AtnBuilder {
    /// Builder for a parser over token types `1..=max_token_type`
    pub fn parser(max_token_type: i32) -> Self {
        Self {
            kind: AtnKind::Parser,
            max_token_type,
            rules: Vec::new(),
            modes: Vec::new(),
            current_mode: 0,
        }
    }

    /// Builder for a lexer; rules go to `DEFAULT_MODE` until [`mode`](Self::mode)
    pub fn lexer() -> Self {
        Self {
            kind: AtnKind::Lexer,
            max_token_type: MAX_CHAR_VALUE,
            rules: Vec::new(),
            modes: vec!["DEFAULT_MODE".to_string()],
            current_mode: 0,
        }
    }

    /// Add a parser rule
    pub fn rule(mut self, name: &str, body: Element) -> Self {
        self.push_rule(name, body, INVALID_TYPE, false);
        self
    }

    /// Add a lexer token rule emitting `token_type`
    pub fn token(mut self, name: &str, token_type: i32, body: Element) -> Self {
        self.push_rule(name, body, token_type, false);
        self
    }

    /// Add a lexer fragment rule (callable, never a token on its own)
    pub fn fragment(mut self, name: &str, body: Element) -> Self {
        self.push_rule(name, body, INVALID_TYPE, true);
        self
    }

    /// Start a new lexer mode; following token rules belong to it
    pub fn mode(mut self, name: &str) -> Self {
        self.modes.push(name.to_string());
        self.current_mode = self.modes.len() - 1;
        self
    }

    fn push_rule(&mut self, name: &str, body: Element, token_type: i32, fragment: bool) {
        self.rules.push(RuleDef {
            name: name.to_string(),
            body,
            token_type,
            mode: self.current_mode,
            fragment,
        });
    }

    /// Lay out the graph and [`link`](Atn::link) it
    pub fn build(self) -> RecognitionResult<Atn> {
        let mut layout = Layout {
            atn: Atn::new(self.kind, self.max_token_type),
            rule_ids: HashMap::new(),
        };

        if self.kind == AtnKind::Lexer {
            for name in &self.modes {
                let start = layout.new_state(0, StateKind::TokensStart);
                layout.define_decision(start);
                layout.atn.mode_to_start.push(start);
                layout.atn.mode_names.push(name.clone());
            }
        }

        for (index, def) in self.rules.iter().enumerate() {
            if layout.rule_ids.insert(def.name.clone(), index).is_some() {
                return Err(RecognitionError::invalid_atn(format!(
                    "rule {} defined twice",
                    def.name
                )));
            }
            let start = layout.new_state(index, StateKind::RuleStart);
            let stop = layout.new_state(index, StateKind::RuleStop);
            layout.atn.rule_to_start.push(start);
            layout.atn.rule_to_stop.push(stop);
            layout.atn.rule_names.push(def.name.clone());
            if self.kind == AtnKind::Lexer {
                layout.atn.rule_to_token_type.push(def.token_type);
            }
        }

        for (index, def) in self.rules.iter().enumerate() {
            let (entry, exit) = layout.element(&def.body, index)?;
            let start = layout.atn.rule_to_start[index];
            let stop = layout.atn.rule_to_stop[index];
            layout.epsilon(start, entry);
            layout.epsilon(exit, stop);
        }

        if self.kind == AtnKind::Lexer {
            for (index, def) in self.rules.iter().enumerate() {
                if !def.fragment {
                    let tokens_start = layout.atn.mode_to_start[def.mode];
                    let rule_start = layout.atn.rule_to_start[index];
                    layout.epsilon(tokens_start, rule_start);
                }
            }
        }

        let mut atn = layout.atn;
        atn.link()?;
        Ok(atn)
    }
}

struct Layout {
    atn: Atn,
    rule_ids: HashMap<String, usize>,
}

impl Layout {
    fn new_state(&mut self, rule_index: usize, kind: StateKind) -> usize {
        let id = self.atn.states.len();
        self.atn.states.push(AtnState::new(id, rule_index, kind));
        id
    }

    fn define_decision(&mut self, state: usize) {
        let decision = self.atn.decision_to_state.len();
        self.atn.decision_to_state.push(state);
        self.atn.states[state].decision = Some(decision);
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.edge(from, Transition::Epsilon { target: to });
    }

    fn edge(&mut self, from: usize, transition: Transition) {
        self.atn.states[from].add_transition(transition);
    }

    /// Two basic states joined by `make(target)`
    fn single(&mut self, rule: usize, make: impl FnOnce(usize) -> Transition) -> (usize, usize) {
        let a = self.new_state(rule, StateKind::Basic);
        let b = self.new_state(rule, StateKind::Basic);
        self.edge(a, make(b));
        (a, b)
    }

    fn lexer_action_index(&mut self, action: LexerAction) -> usize {
        if let Some(i) = self.atn.lexer_actions.iter().position(|a| *a == action) {
            return i;
        }
        self.atn.lexer_actions.push(action);
        self.atn.lexer_actions.len() - 1
    }

    fn element(&mut self, element: &Element, rule: usize) -> RecognitionResult<(usize, usize)> {
        let fragment = match element {
            Element::Symbol(label) => {
                let label = *label;
                self.single(rule, |target| Transition::Atom { target, label })
            }
            Element::Range(from, to) => {
                let (from, to) = (*from, *to);
                self.single(rule, |target| Transition::Range { target, from, to })
            }
            Element::Set(set) => {
                let set = set.clone();
                self.single(rule, |target| Transition::Set { target, set })
            }
            Element::NotSet(set) => {
                let set = set.clone();
                self.single(rule, |target| Transition::NotSet { target, set })
            }
            Element::Wildcard => self.single(rule, |target| Transition::Wildcard { target }),
            Element::RuleRef(name, precedence) => {
                let rule_index = *self.rule_ids.get(name).ok_or_else(|| {
                    RecognitionError::invalid_atn(format!("reference to undefined rule {}", name))
                })?;
                let target = self.atn.rule_to_start[rule_index];
                let precedence = *precedence;
                self.single(rule, |follow_state| Transition::Rule {
                    target,
                    rule_index,
                    precedence,
                    follow_state,
                })
            }
            Element::Seq(items) => {
                if items.is_empty() {
                    return Ok(self.single(rule, |target| Transition::Epsilon { target }));
                }
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.element(item, rule)?);
                }
                for pair in parts.windows(2) {
                    self.epsilon(pair[0].1, pair[1].0);
                }
                (parts[0].0, parts[parts.len() - 1].1)
            }
            Element::Alt(items) => {
                if items.len() == 1 {
                    return self.element(&items[0], rule);
                }
                let start = self.new_state(rule, StateKind::BlockStart);
                self.block(start, items.iter().collect(), rule)?
            }
            Element::Optional(inner, greedy) => {
                let start = self.new_state(rule, StateKind::BlockStart);
                self.define_decision(start);
                let end = self.new_state(rule, StateKind::BlockEnd);
                let mut alts = Vec::new();
                for item in block_alts(inner) {
                    alts.push(self.element(item, rule)?);
                }
                if !greedy {
                    self.epsilon(start, end);
                    self.atn.states[start].non_greedy = true;
                }
                for (entry, exit) in alts {
                    self.epsilon(start, entry);
                    self.epsilon(exit, end);
                }
                if *greedy {
                    self.epsilon(start, end);
                }
                (start, end)
            }
            Element::Star(inner, greedy) => {
                let entry = self.new_state(rule, StateKind::StarLoopEntry);
                self.define_decision(entry);
                let block_start = self.new_state(rule, StateKind::StarBlockStart);
                let (_, block_end) = self.block(block_start, block_alts(inner), rule)?;
                let loop_back = self.new_state(rule, StateKind::StarLoopBack);
                let loop_end = self.new_state(rule, StateKind::LoopEnd);
                self.epsilon(block_end, loop_back);
                self.epsilon(loop_back, entry);
                if *greedy {
                    self.epsilon(entry, block_start);
                    self.epsilon(entry, loop_end);
                } else {
                    self.epsilon(entry, loop_end);
                    self.epsilon(entry, block_start);
                    self.atn.states[entry].non_greedy = true;
                }
                (entry, loop_end)
            }
            Element::Plus(inner, greedy) => {
                let block_start = self.new_state(rule, StateKind::PlusBlockStart);
                let (_, block_end) = self.block(block_start, block_alts(inner), rule)?;
                let loop_back = self.new_state(rule, StateKind::PlusLoopBack);
                self.define_decision(loop_back);
                let loop_end = self.new_state(rule, StateKind::LoopEnd);
                self.epsilon(block_end, loop_back);
                if *greedy {
                    self.epsilon(loop_back, block_start);
                    self.epsilon(loop_back, loop_end);
                } else {
                    self.epsilon(loop_back, loop_end);
                    self.epsilon(loop_back, block_start);
                    self.atn.states[loop_back].non_greedy = true;
                }
                (block_start, loop_end)
            }
            Element::Predicate {
                pred_index,
                ctx_dependent,
            } => {
                let (pred_index, ctx_dependent) = (*pred_index, *ctx_dependent);
                self.single(rule, |target| Transition::Predicate {
                    target,
                    rule_index: rule,
                    pred_index,
                    ctx_dependent,
                })
            }
            Element::Precedence(precedence) => {
                let precedence = *precedence;
                self.single(rule, |target| Transition::Precedence { target, precedence })
            }
            Element::Action(index) => {
                let action_index = match self.atn.kind {
                    AtnKind::Lexer => self.lexer_action_index(LexerAction::Custom {
                        rule_index: rule,
                        action_index: *index,
                    }),
                    AtnKind::Parser => *index,
                };
                self.single(rule, |target| Transition::Action {
                    target,
                    rule_index: rule,
                    action_index,
                    ctx_dependent: false,
                })
            }
            Element::Command(cmd) => {
                if self.atn.kind != AtnKind::Lexer {
                    return Err(RecognitionError::invalid_atn(format!(
                        "lexer command {} in a parser rule",
                        cmd
                    )));
                }
                let action_index = self.lexer_action_index(cmd.clone());
                self.single(rule, |target| Transition::Action {
                    target,
                    rule_index: rule,
                    action_index,
                    ctx_dependent: false,
                })
            }
        };
        Ok(fragment)
    }

    /// Lay out `alts` between `start` and a new block end
    fn block(
        &mut self,
        start: usize,
        alts: Vec<&Element>,
        rule: usize,
    ) -> RecognitionResult<(usize, usize)> {
        if alts.len() > 1 {
            self.define_decision(start);
        }
        let end = self.new_state(rule, StateKind::BlockEnd);
        for item in alts {
            let (entry, exit) = self.element(item, rule)?;
            self.epsilon(start, entry);
            self.epsilon(exit, end);
        }
        Ok((start, end))
    }
}

fn block_alts(element: &Element) -> Vec<&Element> {
    match element {
        Element::Alt(items) => items.iter().collect(),
        other => vec![other],
    }
}

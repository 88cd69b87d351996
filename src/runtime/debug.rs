//! Developer tools
//!
//! Rendering for the structures a grammar author ends up staring at when a
//! decision misbehaves: the ATN as a GraphViz/Mermaid graph, a decision's
//! DFA as text (one line per edge) or DOT, interpreter traces, and source
//! excerpts pointing at a lexer error.

use super::dfa::{Dfa, DfaState};
use super::graph::Atn;
use super::interpreter::{ParseTrace, TraceEvent};
use super::state::StateKind;
use super::token::EOF;
use std::fmt::Write;

/// ATN visualizer
pub struct AtnVisualizer<'a> {
    atn: &'a Atn,
}

impl<'a> AtnVisualizer<'a> {
    /// Create a new ATN visualizer
    pub fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Generate a GraphViz DOT diagram
    ///
    /// Rule start/stop states are drawn as double circles, decision states
    /// are labeled with their decision number and epsilon-class edges are
    /// dashed.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph ATN {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=circle];\n");

        for state in &self.atn.states {
            let shape = match state.kind {
                StateKind::RuleStart | StateKind::RuleStop => "doublecircle",
                StateKind::TokensStart => "box",
                _ => "circle",
            };
            let label = match state.decision {
                Some(d) => format!("{}\\nd={}", state.id, d),
                None => state.id.to_string(),
            };
            let _ = writeln!(
                output,
                "  s{} [shape={}, label=\"{}\", tooltip=\"{}\"]",
                state.id,
                shape,
                label,
                escape(&self.atn.describe_state(state.id))
            );
            for t in &state.transitions {
                let style = if t.is_epsilon() { ", style=dashed" } else { "" };
                let _ = writeln!(
                    output,
                    "  s{} -> s{} [label=\"{}\"{}]",
                    state.id,
                    t.target(),
                    escape(&t.to_string()),
                    style
                );
            }
        }

        for (rule, &start) in self.atn.rule_to_start.iter().enumerate() {
            if let Some(name) = self.atn.rule_names.get(rule) {
                let _ = writeln!(output, "  s{} [xlabel=\"{}\"]", start, escape(name));
            }
        }

        output.push_str("}\n");
        output
    }

    /// Generate a Mermaid diagram
    pub fn to_mermaid(&self) -> String {
        let mut output = String::new();
        output.push_str("graph LR\n");
        for state in &self.atn.states {
            let _ = writeln!(output, "  s{}[\"{}:{:?}\"]", state.id, state.id, state.kind);
            for t in &state.transitions {
                let arrow = if t.is_epsilon() { "-.->" } else { "-->" };
                let _ = writeln!(
                    output,
                    "  s{} {}|\"{}\"| s{}",
                    state.id,
                    arrow,
                    t.to_string().replace('"', "'"),
                    t.target()
                );
            }
        }
        output
    }
}

/// DFA printer
pub struct DfaPrinter<'a> {
    dfa: &'a Dfa,
    lexer: bool,
}

impl<'a> DfaPrinter<'a> {
    /// Printer for a parser decision's DFA
    pub fn new(dfa: &'a Dfa) -> Self {
        Self { dfa, lexer: false }
    }

    /// Print edge labels as characters
    pub fn lexer(mut self, lexer: bool) -> Self {
        self.lexer = lexer;
        self
    }

    /// One `from-label->to` line per edge, in state order
    ///
    /// Accept states are prefixed with `:` and suffixed with `=>` and their
    /// prediction; states that needed full context carry a `^`.
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        for state in self.dfa.states() {
            for (symbol, target) in state.edges() {
                if target.is_error() {
                    continue;
                }
                let _ = writeln!(
                    output,
                    "{}-{}->{}",
                    self.state_label(state),
                    self.symbol_label(symbol),
                    self.state_label(self.dfa.state(target))
                );
            }
        }
        output
    }

    /// Generate a GraphViz DOT diagram
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "digraph DFA_{} {{", self.dfa.decision);
        output.push_str("  rankdir=LR;\n");
        for state in self.dfa.states() {
            let shape = if state.is_accept {
                "doublecircle"
            } else {
                "circle"
            };
            let _ = writeln!(
                output,
                "  {} [shape={}, label=\"{}\"]",
                state.id,
                shape,
                escape(&self.state_label(state))
            );
            for (symbol, target) in state.edges() {
                if target.is_error() {
                    continue;
                }
                let _ = writeln!(
                    output,
                    "  {} -> {} [label=\"{}\"]",
                    state.id,
                    target,
                    escape(&self.symbol_label(symbol))
                );
            }
        }
        if let Some(start) = self.dfa.start() {
            let _ = writeln!(output, "  {} [style=filled, fillcolor=lightblue]", start);
        }
        output.push_str("}\n");
        output
    }

    fn state_label(&self, state: &DfaState) -> String {
        let mut label = String::new();
        if state.is_accept {
            label.push(':');
        }
        label.push_str(&state.id.to_string());
        if state.requires_full_context {
            label.push('^');
        }
        if state.is_accept {
            if let Some(preds) = &state.predicates {
                let preds: Vec<String> = preds.iter().map(ToString::to_string).collect();
                let _ = write!(label, "=>[{}]", preds.join(", "));
            } else if self.lexer {
                let _ = write!(label, "=>{}", state.token_type);
            } else if let Some(alt) = state.prediction {
                let _ = write!(label, "=>{}", alt);
            }
        }
        label
    }

    fn symbol_label(&self, symbol: i32) -> String {
        if symbol == EOF {
            return "EOF".to_string();
        }
        if self.lexer {
            if let Some(c) = u32::try_from(symbol).ok().and_then(char::from_u32) {
                return format!("'{}'", c.escape_default());
            }
        }
        symbol.to_string()
    }
}

/// Interpreter trace formatter
pub struct TraceFormatter<'a> {
    atn: &'a Atn,
}

impl<'a> TraceFormatter<'a> {
    /// Formatter resolving rule names from `atn`
    pub fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Format as a readable string, indented by rule depth
    pub fn format(&self, trace: &ParseTrace) -> String {
        let mut output = String::new();
        let mut depth = 0usize;
        for event in &trace.events {
            match event {
                TraceEvent::EnterRule {
                    rule_index,
                    token_index,
                } => {
                    let _ = writeln!(
                        output,
                        "{}-> {} at {}",
                        "  ".repeat(depth),
                        self.rule_name(*rule_index),
                        token_index
                    );
                    depth += 1;
                }
                TraceEvent::ExitRule {
                    rule_index,
                    token_index,
                } => {
                    depth = depth.saturating_sub(1);
                    let _ = writeln!(
                        output,
                        "{}<- {} at {}",
                        "  ".repeat(depth),
                        self.rule_name(*rule_index),
                        token_index
                    );
                }
                TraceEvent::Decision {
                    decision,
                    state,
                    alt,
                    token_index,
                } => {
                    let _ = writeln!(
                        output,
                        "{}d{} @ s{}: alt {} at {}",
                        "  ".repeat(depth),
                        decision,
                        state,
                        alt,
                        token_index
                    );
                }
                TraceEvent::Match {
                    token_type,
                    token_index,
                } => {
                    let _ = writeln!(
                        output,
                        "{}match {} at {}",
                        "  ".repeat(depth),
                        token_type,
                        token_index
                    );
                }
            }
        }
        output
    }

    fn rule_name(&self, rule_index: usize) -> String {
        self.atn
            .rule_names
            .get(rule_index)
            .cloned()
            .unwrap_or_else(|| format!("rule {}", rule_index))
    }
}

/// Source code formatter for showing error context
pub struct SourceFormatter;

impl SourceFormatter {
    /// Format the line holding character `index` with a position marker
    ///
    /// `index` counts characters, as lexer positions do.
    pub fn format_line(input: &str, index: usize, context_lines: usize) -> String {
        let mut output = String::new();

        // (first char, one past last char) per line
        let mut lines: Vec<(usize, usize)> = Vec::new();
        let mut line_start = 0;
        let mut count = 0;
        for (i, ch) in input.chars().enumerate() {
            if ch == '\n' {
                lines.push((line_start, i));
                line_start = i + 1;
            }
            count = i + 1;
        }
        lines.push((line_start, count));

        let current_line = lines
            .iter()
            .position(|&(start, end)| index >= start && index <= end)
            .unwrap_or(lines.len() - 1);

        let start_line = current_line.saturating_sub(context_lines);
        let end_line = (current_line + context_lines + 1).min(lines.len());

        for (i, &(line_start, line_end)) in lines.iter().enumerate().take(end_line).skip(start_line)
        {
            let content: String = input
                .chars()
                .skip(line_start)
                .take(line_end - line_start)
                .collect();
            let _ = writeln!(output, "{:4} | {}", i + 1, content);
            if i == current_line {
                let column = index.saturating_sub(line_start);
                let _ = writeln!(output, "     | {}^", " ".repeat(column));
            }
        }

        output
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::*;
    use crate::runtime::lexer_sim::LexerAtnSimulator;
    use crate::runtime::semantic::NoHooks;
    use crate::runtime::stream::CharStream;
    use std::sync::Arc;

    #[test]
    fn test_atn_visualizer() {
        let atn = AtnBuilder::parser(2)
            .rule("s", alt(vec![tok(1), tok(2)]))
            .build()
            .unwrap();
        let viz = AtnVisualizer::new(&atn);

        let dot = viz.to_dot();
        assert!(dot.starts_with("digraph ATN"));
        assert!(dot.contains("d=0"));
        assert!(dot.contains("style=dashed"));

        let mermaid = viz.to_mermaid();
        assert!(mermaid.contains("graph LR"));
    }

    #[test]
    fn test_lexer_dfa_text() {
        let atn = AtnBuilder::lexer()
            .token("A", 1, ch('a'))
            .token("AB", 2, lit("ab"))
            .build()
            .unwrap();
        let mut sim = LexerAtnSimulator::new(Arc::new(atn));
        let mut input = CharStream::new("ab");
        sim.match_token(&mut input, 0, &mut NoHooks).unwrap();

        let text = DfaPrinter::new(sim.cache().dfa(0)).lexer(true).to_text();
        assert_eq!(text, "s0-'a'->:s1=>1\n:s1=>1-'b'->:s2=>2\n");
    }

    #[test]
    fn test_trace_formatter() {
        let atn = AtnBuilder::parser(1).rule("s", tok(1)).build().unwrap();
        let trace = ParseTrace {
            events: vec![
                TraceEvent::EnterRule {
                    rule_index: 0,
                    token_index: 0,
                },
                TraceEvent::Match {
                    token_type: 1,
                    token_index: 0,
                },
                TraceEvent::ExitRule {
                    rule_index: 0,
                    token_index: 1,
                },
            ],
        };
        let text = TraceFormatter::new(&atn).format(&trace);
        assert_eq!(text, "-> s at 0\n  match 1 at 0\n<- s at 1\n");
    }

    #[test]
    fn test_source_formatter() {
        let input = "line one\nliné two\nline three";
        let formatted = SourceFormatter::format_line(input, 13, 1);

        assert!(formatted.contains("liné two"));
        assert!(formatted.contains("     |     ^"));
    }
}

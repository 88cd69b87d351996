//! Lexer simulation end to end
//!
//! Covers maximal munch with rollback, rule-order tie-breaks, commands,
//! and feeding lexed tokens into the parser interpreter.

use atnsim::prelude::*;
use atnsim::runtime::HIDDEN_CHANNEL;
use std::sync::Arc;

const A: i32 = 1;
const AB: i32 = 2;

fn a_ab() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::lexer()
            .token("A", A, ch('a'))
            .token("AB", AB, lit("ab"))
            .build()
            .unwrap(),
    )
}

fn types(tokens: &[Token]) -> Vec<i32> {
    tokens.iter().map(|t| t.token_type).collect()
}

// =============================================================================
// Maximal munch
// =============================================================================

#[test]
fn test_longest_match_wins() {
    let tokens = Lexer::new(a_ab(), "ab").tokenize().unwrap();
    assert_eq!(types(&tokens), vec![AB, EOF]);
    assert_eq!(tokens[0].text, "ab");
    assert_eq!((tokens[1].start, tokens[1].stop), (2, 2));
}

#[test]
fn test_rollback_then_error() {
    let mut lexer = Lexer::new(a_ab(), "ac");
    let first = lexer.next_token().unwrap();
    assert_eq!((first.token_type, first.text.as_str()), (A, "a"));
    assert_eq!(lexer.input().index(), 1);

    let err = lexer.next_token().unwrap_err();
    assert_eq!(
        err,
        RecognitionError::LexerNoViableAlt {
            mode: 0,
            start_index: 1,
            index: 1,
            line: 1,
            column: 1,
        }
    );
    assert!(err.is_syntax_error());

    // the caller decides how to recover
    lexer.recover();
    assert_eq!(lexer.next_token().unwrap().token_type, EOF);
}

#[test]
fn test_tokenize_stops_at_first_error() {
    assert!(matches!(
        Lexer::new(a_ab(), "aca").tokenize(),
        Err(RecognitionError::LexerNoViableAlt { start_index: 1, .. })
    ));
}

#[test]
fn test_earliest_rule_breaks_ties() {
    // "if" matches both rules with the same length
    let build = |keyword_first: bool| {
        let keyword = ("IF", 1, lit("if"));
        let ident = ("ID", 2, plus(char_range('a', 'z')));
        let (first, second) = if keyword_first {
            (keyword, ident)
        } else {
            (ident, keyword)
        };
        Arc::new(
            AtnBuilder::lexer()
                .token(first.0, first.1, first.2)
                .token(second.0, second.1, second.2)
                .build()
                .unwrap(),
        )
    };
    let tokens = Lexer::new(build(true), "if iff").tokenize_recovering().0;
    assert_eq!(tokens[0].token_type, 1);
    let tokens = Lexer::new(build(false), "if").tokenize().unwrap();
    assert_eq!(tokens[0].token_type, 2);
}

#[test]
fn test_lines_and_columns() {
    let atn = Arc::new(
        AtnBuilder::lexer()
            .token("ID", 1, plus(char_range('a', 'z')))
            .token("NL", 2, seq(vec![ch('\n'), command(LexerAction::Skip)]))
            .build()
            .unwrap(),
    );
    let tokens = Lexer::new(atn, "ab\ncd\nx").tokenize().unwrap();
    let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();
    assert_eq!(positions, vec![(1, 0), (2, 0), (3, 0), (3, 1)]);
}

// =============================================================================
// DFA cache
// =============================================================================

#[test]
fn test_second_lexer_reuses_dfa() {
    let mut lexer = Lexer::new(a_ab(), "abaab");
    lexer.tokenize().unwrap();
    let sim = lexer.into_simulator();
    let states = sim.cache().num_states();
    assert!(states > 0);

    let mut lexer = Lexer::from_simulator(sim, "aabab");
    let before = lexer.simulator().stats();
    let tokens = lexer.tokenize().unwrap();
    assert_eq!(types(&tokens), vec![A, AB, AB, EOF]);
    let after = lexer.simulator().stats();
    assert_eq!(after.closure_calls, before.closure_calls);
    assert!(after.dfa_hits > before.dfa_hits);
    assert_eq!(lexer.simulator().cache().num_states(), states);
}

// =============================================================================
// Pipeline
// =============================================================================

const INT: i32 = 1;
const PLUS: i32 = 2;

#[test]
fn test_lexed_tokens_drive_the_parser() {
    let lexer_atn = Arc::new(
        AtnBuilder::lexer()
            .token("INT", INT, plus(char_range('0', '9')))
            .token("PLUS", PLUS, ch('+'))
            .token("WS", 3, seq(vec![plus(ch(' ')), command(LexerAction::Skip)]))
            .token(
                "COMMENT",
                4,
                seq(vec![lit("/*"), star_lazy(any()), lit("*/"), command(LexerAction::Channel(HIDDEN_CHANNEL))]),
            )
            .build()
            .unwrap(),
    );
    // s : expr EOF ;  expr : INT (PLUS expr)* ;
    let parser_atn = Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![rule("expr"), eof()]))
            .rule("expr", seq(vec![tok(INT), star(seq(vec![tok(PLUS), rule("expr")]))]))
            .build()
            .unwrap(),
    );

    let tokens = Lexer::new(lexer_atn, "12 + /* two */ 34").tokenize().unwrap();
    assert_eq!(types(&tokens), vec![INT, PLUS, 4, INT, EOF]);

    let mut parser = ParserInterpreter::new(parser_atn, CommonTokenStream::new(tokens));
    let trace = parser.parse_rule("s").unwrap();
    assert_eq!(trace.matched(), vec![INT, PLUS, INT, EOF]);
    assert_eq!(trace.decisions(), vec![(0, 1), (0, 2), (0, 2)]);
}

//! Benchmarks for cold versus warm DFA caches
//!
//! Cold: every iteration starts from a fresh simulator, so each decision
//! computes closures and builds DFA states.
//! Warm: the simulator is primed once and reused, so steady-state prediction
//! only walks cached DFA edges.
//!
//! Run with: cargo bench --bench prediction

use atnsim::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

// ============================================================================
// Grammars
// ============================================================================

const INT: i32 = 1;
const PLUS: i32 = 2;
const STAR: i32 = 3;
const LPAREN: i32 = 4;
const RPAREN: i32 = 5;
const WS: i32 = 6;

/// s : e EOF ;  e : t (PLUS t)* ;  t : f (STAR f)* ;  f : INT | LPAREN e RPAREN ;
fn arithmetic_parser() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::parser(5)
            .rule("s", seq(vec![rule("e"), eof()]))
            .rule("e", seq(vec![rule("t"), star(seq(vec![tok(PLUS), rule("t")]))]))
            .rule("t", seq(vec![rule("f"), star(seq(vec![tok(STAR), rule("f")]))]))
            .rule(
                "f",
                alt(vec![tok(INT), seq(vec![tok(LPAREN), rule("e"), tok(RPAREN)])]),
            )
            .build()
            .expect("arithmetic grammar"),
    )
}

fn arithmetic_lexer() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::lexer()
            .token("INT", INT, plus(char_range('0', '9')))
            .token("PLUS", PLUS, ch('+'))
            .token("STAR", STAR, ch('*'))
            .token("LPAREN", LPAREN, ch('('))
            .token("RPAREN", RPAREN, ch(')'))
            .token("WS", WS, seq(vec![plus(set([' ' as i32, '\n' as i32])), command(LexerAction::Skip)]))
            .build()
            .expect("arithmetic lexer"),
    )
}

/// `(1 + 2 * 3) * 4 + ...` repeated `terms` times
fn source(terms: usize) -> String {
    let mut out = String::from("0");
    for i in 0..terms {
        out.push_str(&format!(" + ({} + {} * {}) * {}", i, i + 1, i + 2, i + 3));
    }
    out
}

fn tokens(text: &str) -> Vec<Token> {
    Lexer::new(arithmetic_lexer(), text)
        .tokenize()
        .expect("benchmark input lexes")
}

// ============================================================================
// Parser
// ============================================================================

fn parse_with(sim: ParserAtnSimulator, tokens: &[Token]) -> ParserAtnSimulator {
    let mut parser = ParserInterpreter::from_simulator(sim, CommonTokenStream::new(tokens.to_vec()));
    black_box(parser.parse(0).expect("benchmark input parses"));
    parser.into_simulator()
}

fn bench_parser(c: &mut Criterion) {
    let atn = arithmetic_parser();
    let mut g = c.benchmark_group("parser");
    for terms in [1, 16, 128] {
        let input = tokens(&source(terms));

        g.bench_function(format!("cold_{}", terms), |b| {
            b.iter(|| parse_with(ParserAtnSimulator::new(atn.clone()), black_box(&input)))
        });

        let mut warm = Some(parse_with(ParserAtnSimulator::new(atn.clone()), &input));
        g.bench_function(format!("warm_{}", terms), |b| {
            b.iter(|| {
                if let Some(sim) = warm.take() {
                    warm = Some(parse_with(sim, black_box(&input)));
                }
            })
        });
    }
    g.finish();
}

fn bench_prediction_modes(c: &mut Criterion) {
    let atn = arithmetic_parser();
    let input = tokens(&source(16));
    let mut g = c.benchmark_group("prediction_mode");
    for mode in [PredictionMode::Sll, PredictionMode::Ll, PredictionMode::LlExactAmbigDetection] {
        let config = SimulatorConfig::new().with_prediction_mode(mode);
        g.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| {
                let sim = ParserAtnSimulator::with_config(atn.clone(), config);
                parse_with(sim, black_box(&input))
            })
        });
    }
    g.finish();
}

// ============================================================================
// Lexer
// ============================================================================

fn bench_lexer(c: &mut Criterion) {
    let atn = arithmetic_lexer();
    let text = source(128);
    let mut g = c.benchmark_group("lexer");

    g.bench_function("cold", |b| {
        b.iter(|| Lexer::new(atn.clone(), black_box(&text)).tokenize())
    });

    let mut primed = Lexer::new(atn.clone(), &text);
    primed.tokenize().expect("benchmark input lexes");
    let mut warm = Some(primed.into_simulator());
    g.bench_function("warm", |b| {
        b.iter(|| {
            if let Some(sim) = warm.take() {
                let mut lexer = Lexer::from_simulator(sim, black_box(&text));
                black_box(lexer.tokenize().expect("benchmark input lexes"));
                warm = Some(lexer.into_simulator());
            }
        })
    });
    g.finish();
}

criterion_group!(benches, bench_parser, bench_prediction_modes, bench_lexer);
criterion_main!(benches);

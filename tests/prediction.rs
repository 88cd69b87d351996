//! Adaptive prediction end to end
//!
//! Grammars are interpreted over token-type streams and the recorded
//! decisions and diagnostics are checked.

use atnsim::prelude::*;
use atnsim::runtime::{Diagnostic, RecordingListener};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const INT: i32 = 1;
const PLUS: i32 = 2;

/// s : expr EOF ;  expr : INT (PLUS expr)* ;
fn right_nested_sum() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![rule("expr"), eof()]))
            .rule(
                "expr",
                seq(vec![tok(INT), star(seq(vec![tok(PLUS), rule("expr")]))]),
            )
            .build()
            .unwrap(),
    )
}

fn interpreter(atn: Arc<Atn>, types: &[i32], mode: PredictionMode) -> (ParserInterpreter, RecordingListener) {
    let config = SimulatorConfig::new().with_prediction_mode(mode);
    let mut parser = ParserInterpreter::with_config(atn, CommonTokenStream::from_types(types), config);
    let recorder = RecordingListener::new();
    parser.add_listener(Box::new(recorder.clone()));
    (parser, recorder)
}

// =============================================================================
// Ambiguity
// =============================================================================

#[test]
fn test_sum_binds_to_innermost_loop() {
    // 1 + 2 + 3: the second '+' could continue either loop; alt 1 keeps it
    // in the innermost one
    for mode in [PredictionMode::Sll, PredictionMode::Ll, PredictionMode::LlExactAmbigDetection] {
        let (mut parser, _) = interpreter(right_nested_sum(), &[INT, PLUS, INT, PLUS, INT], mode);
        let trace = parser.parse_rule("s").unwrap();
        assert_eq!(
            trace.decisions(),
            vec![(0, 1), (0, 1), (0, 2), (0, 2), (0, 2)],
            "{:?}",
            mode
        );
        assert_eq!(trace.matched(), vec![INT, PLUS, INT, PLUS, INT, EOF]);
    }
}

#[test]
fn test_exact_mode_reports_exact_ambiguity() {
    let (mut parser, recorder) = interpreter(
        right_nested_sum(),
        &[INT, PLUS, INT, PLUS, INT],
        PredictionMode::LlExactAmbigDetection,
    );
    parser.parse(0).unwrap();
    let events = recorder.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Diagnostic::AttemptingFullContext { decision: 0, .. })));
    assert!(
        events.iter().any(|e| matches!(
            e,
            Diagnostic::Ambiguity { decision: 0, exact: true, alts, .. } if alts.len() == 2
        )),
        "{:?}",
        events
    );
}

#[test]
fn test_sll_mode_reports_nothing() {
    let (mut parser, recorder) = interpreter(
        right_nested_sum(),
        &[INT, PLUS, INT, PLUS, INT],
        PredictionMode::Sll,
    );
    parser.parse(0).unwrap();
    assert!(recorder.events().is_empty());
    assert_eq!(parser.simulator().stats().ll_predictions, 0);
}

#[test]
fn test_single_sum_is_context_sensitive() {
    // SLL cannot tell whether '+' continues this loop or an enclosing one;
    // the real stack has no enclosing loop, so full LL settles it alone
    let (mut parser, recorder) = interpreter(right_nested_sum(), &[INT, PLUS, INT], PredictionMode::Ll);
    let trace = parser.parse(0).unwrap();
    assert_eq!(trace.decisions(), vec![(0, 1), (0, 2), (0, 2)]);
    let events = recorder.events();
    assert_eq!(events.len(), 2, "{:?}", events);
    assert!(matches!(
        events[0],
        Diagnostic::AttemptingFullContext { decision: 0, start_index: 1, .. }
    ));
    assert!(matches!(
        events[1],
        Diagnostic::ContextSensitivity { decision: 0, start_index: 1, prediction: 1, .. }
    ));
}

// =============================================================================
// Predicates
// =============================================================================

struct Allow(Vec<usize>);

impl ParserHooks for Allow {
    fn sempred(&mut self, _ctx: Option<&[RuleInvocation]>, _rule: usize, pred: usize) -> bool {
        self.0.contains(&pred)
    }
}

/// s : r EOF ;  r : {p0}? INT | {p1}? INT PLUS? ;
fn gated() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![rule("r"), eof()]))
            .rule(
                "r",
                alt(vec![
                    seq(vec![pred(0), tok(INT)]),
                    seq(vec![pred(1), tok(INT), opt(tok(PLUS))]),
                ]),
            )
            .build()
            .unwrap(),
    )
}

#[test]
fn test_predicates_choose_between_conflicting_alts() {
    for (allowed, expected) in [(vec![0, 1], 1), (vec![1], 2), (vec![0], 1)] {
        let mut parser = ParserInterpreter::new(gated(), CommonTokenStream::from_types(&[INT]))
            .with_hooks(Allow(allowed));
        let trace = parser.parse(0).unwrap();
        assert_eq!(trace.decisions()[0], (0, expected));
    }
}

#[test]
fn test_all_predicates_false_is_no_viable_alt() {
    let mut parser = ParserInterpreter::new(gated(), CommonTokenStream::from_types(&[INT]))
        .with_hooks(Allow(vec![]));
    assert!(matches!(
        parser.parse(0),
        Err(RecognitionError::NoViableAlt { decision: 0, .. })
    ));
}

/// s : (a | INT b) EOF ;  a : r ;  b : r ;  r : {only under a}? INT | INT ;
fn caller_gated() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![alt(vec![rule("a"), seq(vec![tok(INT), rule("b")])]), eof()]))
            .rule("a", rule("r"))
            .rule("b", rule("r"))
            .rule("r", alt(vec![seq(vec![ctx_pred(0), tok(INT)]), tok(INT)]))
            .build()
            .unwrap(),
    )
}

const RULE_A: usize = 1;
const RULE_B: usize = 2;

/// Passes the predicate only when `a` is on the caller stack
#[derive(Clone, Default)]
struct UnderA {
    stacks: Rc<RefCell<Vec<Vec<usize>>>>,
}

impl ParserHooks for UnderA {
    fn sempred(&mut self, ctx: Option<&[RuleInvocation]>, _rule: usize, _pred: usize) -> bool {
        let rules: Vec<usize> = ctx.unwrap_or(&[]).iter().map(|f| f.rule_index).collect();
        let under_a = rules.contains(&RULE_A);
        self.stacks.borrow_mut().push(rules);
        under_a
    }
}

#[test]
fn test_context_predicate_sees_caller_stack() {
    for mode in [PredictionMode::Sll, PredictionMode::Ll] {
        for (input, expected, caller) in [
            (vec![INT], vec![(0, 1), (1, 1)], RULE_A),
            (vec![INT, INT], vec![(0, 2), (1, 2)], RULE_B),
        ] {
            let hooks = UnderA::default();
            let stacks = hooks.stacks.clone();
            let (parser, recorder) = interpreter(caller_gated(), &input, mode);
            let mut parser = parser.with_hooks(hooks);
            let trace = parser.parse(0).unwrap();
            assert_eq!(trace.decisions(), expected, "{:?} {:?}", mode, input);

            let stacks = stacks.borrow();
            assert!(!stacks.is_empty());
            assert!(stacks.iter().all(|rules| rules.contains(&caller)), "{:?}", stacks);

            let escalated = recorder
                .events()
                .iter()
                .any(|e| matches!(e, Diagnostic::AttemptingFullContext { decision: 1, .. }));
            // under `a` both alternatives survive the predicate, so LL
            // prediction has to look at the real stack
            assert_eq!(escalated, mode == PredictionMode::Ll && caller == RULE_A);
        }
    }
}

/// s : expr EOF ;  expr[p] : INT ({2 >= p}? PLUS expr[3])* ;
fn precedence_sum() -> Arc<Atn> {
    Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![rule("expr"), eof()]))
            .rule(
                "expr",
                seq(vec![
                    tok(INT),
                    star(seq(vec![precpred(2), tok(PLUS), rule_prec("expr", 3)])),
                ]),
            )
            .build()
            .unwrap(),
    )
}

#[test]
fn test_precedence_predicates_make_sum_left_associative() {
    for mode in [PredictionMode::Sll, PredictionMode::Ll, PredictionMode::LlExactAmbigDetection] {
        let (mut parser, recorder) = interpreter(precedence_sum(), &[INT, PLUS, INT, PLUS, INT], mode);
        let trace = parser.parse(0).unwrap();
        // the inner expr[3] never takes '+', the outer loop takes both
        assert_eq!(
            trace.decisions(),
            vec![(0, 1), (0, 2), (0, 1), (0, 2), (0, 2)],
            "{:?}",
            mode
        );
        assert_eq!(trace.matched(), vec![INT, PLUS, INT, PLUS, INT, EOF]);

        let events = recorder.events();
        if mode == PredictionMode::Sll {
            assert!(events.is_empty(), "{:?}", events);
            continue;
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, Diagnostic::AttemptingFullContext { decision: 0, .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            Diagnostic::ContextSensitivity { decision: 0, prediction: 1, .. }
        )));
        assert!(
            !events.iter().any(|e| matches!(e, Diagnostic::Ambiguity { .. })),
            "{:?}",
            events
        );
    }
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_no_viable_alt_is_explicit() {
    // s : INT PLUS INT | INT INT ;
    let atn = Arc::new(
        AtnBuilder::parser(2)
            .rule(
                "s",
                alt(vec![seq(vec![tok(INT), tok(PLUS), tok(INT)]), seq(vec![tok(INT), tok(INT)])]),
            )
            .build()
            .unwrap(),
    );
    let mut sim = ParserAtnSimulator::new(atn.clone());
    let mut input = CommonTokenStream::from_types(&[INT]);
    let err = sim
        .adaptive_predict(&mut input, 0, &[RuleInvocation::root(0)], &mut NoHooks)
        .unwrap_err();
    assert_eq!(
        err,
        RecognitionError::NoViableAlt {
            decision: 0,
            start_index: 0,
            offending_index: 1,
            offending_type: EOF,
        }
    );
    assert_eq!(input.index(), 0);

    let mut parser = ParserInterpreter::new(atn, CommonTokenStream::from_types(&[PLUS]));
    assert!(matches!(
        parser.parse(0),
        Err(RecognitionError::NoViableAlt { offending_index: 0, offending_type: PLUS, .. })
    ));
}

#[test]
fn test_mismatch_after_prediction() {
    // s : INT PLUS EOF ;
    let atn = Arc::new(
        AtnBuilder::parser(2)
            .rule("s", seq(vec![tok(INT), tok(PLUS), eof()]))
            .build()
            .unwrap(),
    );
    let mut parser = ParserInterpreter::new(atn, CommonTokenStream::from_types(&[INT, INT]));
    assert!(matches!(
        parser.parse(0),
        Err(RecognitionError::InputMismatch { found: INT, index: 1, .. })
    ));
}

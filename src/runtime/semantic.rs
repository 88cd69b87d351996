//! Semantic contexts: predicates carried by configurations
//!
//! During SLL prediction predicates met at the left edge of a decision are
//! not evaluated; they are attached to configurations and combined with
//! `and`/`or` until an accept state is reached. Evaluation goes through the
//! [`ParserHooks`] supplied by the caller.

use super::rule_context::RuleInvocation;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Callbacks into grammar-specific code
///
/// The defaults accept every predicate and implement `precpred` against the
/// precedence of the innermost rule invocation.
pub trait ParserHooks {
    /// Evaluate predicate `pred_index` of `rule_index`
    ///
    /// `ctx` is the caller's rule stack for context-dependent predicates and
    /// `None` otherwise.
    fn sempred(
        &mut self,
        ctx: Option<&[RuleInvocation]>,
        rule_index: usize,
        pred_index: usize,
    ) -> bool {
        let _ = (ctx, rule_index, pred_index);
        true
    }

    /// Evaluate a precedence predicate
    fn precpred(&mut self, ctx: &[RuleInvocation], precedence: i32) -> bool {
        ctx.last().map_or(true, |frame| precedence >= frame.precedence)
    }

    /// Run embedded action `action_index` of `rule_index`
    fn action(&mut self, ctx: &[RuleInvocation], rule_index: usize, action_index: usize) {
        let _ = (ctx, rule_index, action_index);
    }
}

/// Hooks that accept every predicate and ignore actions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ParserHooks for NoHooks {}

/// A (possibly compound) predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticContext {
    /// Always true
    None,
    /// `{...}?` predicate
    Predicate {
        /// Rule containing the predicate
        rule_index: usize,
        /// Predicate index
        pred_index: usize,
        /// Whether evaluation needs the caller's context
        ctx_dependent: bool,
    },
    /// `precpred(_ctx, n)`
    Precedence(i32),
    /// Conjunction; operands sorted and distinct
    And(Arc<[SemanticContext]>),
    /// Disjunction; operands sorted and distinct
    Or(Arc<[SemanticContext]>),
}

impl Default for SemanticContext {
    fn default() -> Self {
        SemanticContext::None
    }
}

impl SemanticContext {
    /// Whether this is the always-true context
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, SemanticContext::None)
    }

    /// Conjunction of `a` and `b`
    pub fn and(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        if a.is_none() {
            return b.clone();
        }
        if b.is_none() {
            return a.clone();
        }
        let mut operands = BTreeSet::new();
        for side in [a, b] {
            match side {
                SemanticContext::And(inner) => operands.extend(inner.iter().cloned()),
                other => {
                    operands.insert(other.clone());
                }
            }
        }
        // the weakest precedence requirement subsumes the others
        reduce_precedence(&mut operands, |p, q| p.min(q));
        Self::combine(operands, SemanticContext::And)
    }

    /// Disjunction of `a` and `b`
    pub fn or(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        if a.is_none() || b.is_none() {
            return SemanticContext::None;
        }
        let mut operands = BTreeSet::new();
        for side in [a, b] {
            match side {
                SemanticContext::Or(inner) => operands.extend(inner.iter().cloned()),
                other => {
                    operands.insert(other.clone());
                }
            }
        }
        reduce_precedence(&mut operands, |p, q| p.max(q));
        Self::combine(operands, SemanticContext::Or)
    }

    fn combine(
        operands: BTreeSet<SemanticContext>,
        wrap: fn(Arc<[SemanticContext]>) -> SemanticContext,
    ) -> SemanticContext {
        if operands.len() == 1 {
            if let Some(single) = operands.into_iter().next() {
                return single;
            }
            return SemanticContext::None;
        }
        wrap(operands.into_iter().collect::<Vec<_>>().into())
    }

    /// Evaluate against the caller's rule stack
    pub fn eval(&self, hooks: &mut dyn ParserHooks, outer: &[RuleInvocation]) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate {
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                let local = if *ctx_dependent { Some(outer) } else { None };
                hooks.sempred(local, *rule_index, *pred_index)
            }
            SemanticContext::Precedence(precedence) => hooks.precpred(outer, *precedence),
            SemanticContext::And(operands) => operands.iter().all(|op| op.eval(hooks, outer)),
            SemanticContext::Or(operands) => operands.iter().any(|op| op.eval(hooks, outer)),
        }
    }
}

fn reduce_precedence(operands: &mut BTreeSet<SemanticContext>, pick: fn(i32, i32) -> i32) {
    let precedences: Vec<i32> = operands
        .iter()
        .filter_map(|op| match op {
            SemanticContext::Precedence(p) => Some(*p),
            _ => None,
        })
        .collect();
    if precedences.len() < 2 {
        return;
    }
    operands.retain(|op| !matches!(op, SemanticContext::Precedence(_)));
    if let Some(reduced) = precedences.into_iter().reduce(pick) {
        operands.insert(SemanticContext::Precedence(reduced));
    }
}

impl fmt::Display for SemanticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticContext::None => write!(f, "{{true}}?"),
            SemanticContext::Predicate {
                rule_index,
                pred_index,
                ..
            } => write!(f, "{{{}:{}}}?", rule_index, pred_index),
            SemanticContext::Precedence(p) => write!(f, "{{{}>=prec}}?", p),
            SemanticContext::And(operands) | SemanticContext::Or(operands) => {
                let sep = if matches!(self, SemanticContext::And(_)) {
                    "&&"
                } else {
                    "||"
                };
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", op)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(i: usize) -> SemanticContext {
        SemanticContext::Predicate {
            rule_index: 0,
            pred_index: i,
            ctx_dependent: false,
        }
    }

    struct Only(usize);

    impl ParserHooks for Only {
        fn sempred(&mut self, _: Option<&[RuleInvocation]>, _: usize, pred_index: usize) -> bool {
            pred_index == self.0
        }
    }

    #[test]
    fn test_and_absorbs_none() {
        let p = pred(1);
        assert_eq!(SemanticContext::and(&SemanticContext::None, &p), p);
        assert_eq!(SemanticContext::and(&p, &SemanticContext::None), p);
        assert_eq!(SemanticContext::and(&p, &p), p);
    }

    #[test]
    fn test_or_with_none_is_none() {
        assert!(SemanticContext::or(&pred(1), &SemanticContext::None).is_none());
    }

    #[test]
    fn test_flatten_is_order_independent() {
        let ab = SemanticContext::and(&pred(1), &pred(2));
        let abc = SemanticContext::and(&ab, &pred(3));
        let cba = SemanticContext::and(&pred(3), &SemanticContext::and(&pred(2), &pred(1)));
        assert_eq!(abc, cba);
        assert_eq!(abc.to_string(), "{0:1}?&&{0:2}?&&{0:3}?");
    }

    #[test]
    fn test_precedence_reduction() {
        let and = SemanticContext::and(
            &SemanticContext::Precedence(3),
            &SemanticContext::Precedence(1),
        );
        assert_eq!(and, SemanticContext::Precedence(1));
        let or = SemanticContext::or(
            &SemanticContext::Precedence(3),
            &SemanticContext::Precedence(1),
        );
        assert_eq!(or, SemanticContext::Precedence(3));
    }

    #[test]
    fn test_eval() {
        let mut hooks = Only(2);
        assert!(pred(2).eval(&mut hooks, &[]));
        assert!(!pred(1).eval(&mut hooks, &[]));
        assert!(!SemanticContext::and(&pred(1), &pred(2)).eval(&mut hooks, &[]));
        assert!(SemanticContext::or(&pred(1), &pred(2)).eval(&mut hooks, &[]));
    }

    #[test]
    fn test_default_precpred() {
        let stack = [RuleInvocation::root(0), RuleInvocation::invoked(0, 4, 2)];
        let mut hooks = NoHooks;
        assert!(SemanticContext::Precedence(2).eval(&mut hooks, &stack));
        assert!(!SemanticContext::Precedence(1).eval(&mut hooks, &stack));
    }
}

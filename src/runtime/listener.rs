//! Diagnostic listeners
//!
//! The parser simulator reports three kinds of events. None of them is an
//! error: parsing continues with the predicted alternative.

use super::alt_set::AltSet;
use super::config::ConfigSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of prediction diagnostics
///
/// `start_index`/`stop_index` are token indexes of the lookahead span.
pub trait DiagnosticListener {
    /// Full-context prediction ended with several viable alternatives
    fn report_ambiguity(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &AltSet,
    ) {
        let _ = (decision, configs, start_index, stop_index, exact, ambig_alts);
    }

    /// SLL hit a conflict; prediction is retried with full context
    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        conflicting_alts: &AltSet,
    ) {
        let _ = (decision, configs, start_index, stop_index, conflicting_alts);
    }

    /// Full context resolved a conflict that SLL could not
    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        prediction: usize,
    ) {
        let _ = (decision, configs, start_index, stop_index, prediction);
    }
}

/// A recorded diagnostic event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// See [`DiagnosticListener::report_ambiguity`]
    Ambiguity {
        /// Decision number
        decision: usize,
        /// First token index of the span
        start_index: usize,
        /// Last token index of the span
        stop_index: usize,
        /// Whether the ambiguity is exact
        exact: bool,
        /// The ambiguous alternatives
        alts: AltSet,
    },
    /// See [`DiagnosticListener::report_attempting_full_context`]
    AttemptingFullContext {
        /// Decision number
        decision: usize,
        /// First token index of the span
        start_index: usize,
        /// Last token index of the span
        stop_index: usize,
        /// Alternatives SLL could not separate
        conflicting_alts: AltSet,
    },
    /// See [`DiagnosticListener::report_context_sensitivity`]
    ContextSensitivity {
        /// Decision number
        decision: usize,
        /// First token index of the span
        start_index: usize,
        /// Last token index of the span
        stop_index: usize,
        /// Alternative chosen with full context
        prediction: usize,
    },
}

/// Listener appending every event to a shared log
///
/// Clone it before handing it to the simulator and read the log through the
/// clone.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingListener {
    /// Create a listener with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the log
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    /// Empty the log
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DiagnosticListener for RecordingListener {
    fn report_ambiguity(
        &mut self,
        decision: usize,
        _configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &AltSet,
    ) {
        self.events.borrow_mut().push(Diagnostic::Ambiguity {
            decision,
            start_index,
            stop_index,
            exact,
            alts: ambig_alts.clone(),
        });
    }

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        _configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        conflicting_alts: &AltSet,
    ) {
        self.events
            .borrow_mut()
            .push(Diagnostic::AttemptingFullContext {
                decision,
                start_index,
                stop_index,
                conflicting_alts: conflicting_alts.clone(),
            });
    }

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        _configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        prediction: usize,
    ) {
        self.events.borrow_mut().push(Diagnostic::ContextSensitivity {
            decision,
            start_index,
            stop_index,
            prediction,
        });
    }
}

/// Listener forwarding events to the `log` crate at debug level
///
/// Does nothing unless the `logging` feature is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl DiagnosticListener for LoggingListener {
    fn report_ambiguity(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &AltSet,
    ) {
        let _ = (decision, configs, start_index, stop_index, exact, ambig_alts);
        log_debug!(
            "ambiguity d={}: alts={} exact={} tokens {}..{}",
            decision,
            ambig_alts,
            exact,
            start_index,
            stop_index
        );
    }

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        conflicting_alts: &AltSet,
    ) {
        let _ = (decision, configs, start_index, stop_index, conflicting_alts);
        log_debug!(
            "attempting full context d={}: conflicting {} in {} tokens {}..{}",
            decision,
            conflicting_alts,
            configs,
            start_index,
            stop_index
        );
    }

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        configs: &ConfigSet,
        start_index: usize,
        stop_index: usize,
        prediction: usize,
    ) {
        let _ = (decision, configs, start_index, stop_index, prediction);
        log_debug!(
            "context sensitivity d={}: alt {} in {} tokens {}..{}",
            decision,
            prediction,
            configs,
            start_index,
            stop_index
        );
    }
}

//! Simulator configuration

use super::prediction_mode::PredictionMode;

/// Default maximum closure depth (rule calls deep)
pub const DEFAULT_MAX_CLOSURE_DEPTH: usize = 10_000;

/// Default lookahead limit per prediction (0 = unlimited)
pub const DEFAULT_MAX_PREDICTION_STEPS: usize = 0;

/// Limits and mode for the simulators
///
/// # Example
///
/// ```rust
/// use atnsim::runtime::{PredictionMode, SimulatorConfig};
///
/// let config = SimulatorConfig::new()
///     .with_prediction_mode(PredictionMode::LlExactAmbigDetection)
///     .with_max_prediction_steps(10_000);
/// assert_eq!(config.max_prediction_steps, 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Prediction strategy for parser decisions
    pub prediction_mode: PredictionMode,

    /// Maximum depth of the closure stack
    pub max_closure_depth: usize,

    /// Maximum lookahead symbols per prediction (0 = unlimited)
    pub max_prediction_steps: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            prediction_mode: PredictionMode::default(),
            max_closure_depth: DEFAULT_MAX_CLOSURE_DEPTH,
            max_prediction_steps: DEFAULT_MAX_PREDICTION_STEPS,
        }
    }
}

impl SimulatorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prediction mode
    pub fn with_prediction_mode(mut self, mode: PredictionMode) -> Self {
        self.prediction_mode = mode;
        self
    }

    /// Set the maximum closure depth
    pub fn with_max_closure_depth(mut self, depth: usize) -> Self {
        self.max_closure_depth = depth;
        self
    }

    /// Set the lookahead limit per prediction
    pub fn with_max_prediction_steps(mut self, steps: usize) -> Self {
        self.max_prediction_steps = steps;
        self
    }
}

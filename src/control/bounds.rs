//! Saturation and throttle helpers shared by the controller and the session.

use serde::{Deserialize, Serialize};

/// Clamp `value` to the closed interval `[-limit, limit]`.
///
/// `limit` is expected to be non-negative.
pub fn saturate(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}

/// Sum of the twiddle step sizes; tuning stops once this drops below tolerance.
pub fn step_sum(steps: &[f64; 3]) -> f64 {
    steps.iter().sum()
}

// ---------------------------------------------------------------------------
// Throttle: speed command derived from the current error
// ---------------------------------------------------------------------------

/// Throttle law: slow down in proportion to how far off the path we are,
/// relative to the worst error seen so far.
///
/// `throttle = base - gain * (|cte| / effective_max)` where `effective_max`
/// is the controller's max absolute CTE, or `fallback_max_cte` while that
/// maximum is still below `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Throttle {
    /// Throttle with zero error.
    pub base: f64,
    /// How much throttle is shed at the worst observed error.
    pub gain: f64,
    /// Substituted for the max CTE when no meaningful error has been seen.
    pub fallback_max_cte: f64,
    /// Max CTE values below this count as zero.
    pub epsilon: f64,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            base: 0.5,
            gain: 0.49,
            // Keeps throttle near its ceiling early in a run.
            fallback_max_cte: 1000.0,
            epsilon: 1e-9,
        }
    }
}

impl Throttle {
    /// Throttle command for `cte` given the controller's max absolute CTE.
    pub fn command(&self, cte: f64, max_abs_cte: f64) -> f64 {
        let effective_max = if max_abs_cte < self.epsilon {
            self.fallback_max_cte
        } else {
            max_abs_cte
        };
        self.base - self.gain * (cte.abs() / effective_max)
    }
}

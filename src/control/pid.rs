//! # Stage: PID Controller
//!
//! ## Responsibility
//! Convert one cross-track-error sample into a steering command in `[-1, 1]`
//! using proportional, windowed-integral and derivative terms. Also keeps the
//! running statistics the tuner and throttle law read: streaming mean squared
//! error, max absolute CTE and the iteration count.
//!
//! ## Guarantees
//! - Bounded: the steering output is always saturated to `[-1, 1]`
//! - The integral window never holds more than `window_capacity` samples
//! - `max_abs_cte` never decreases during a controller's lifetime
//! - Infallible: `update` has no error path
//!
//! ## NOT Responsible For
//! - Gain tuning (see [`super::twiddle`])
//! - Rejecting non-finite input (the protocol layer does that)

use std::collections::VecDeque;

use super::bounds::saturate;
use super::gains::Gains;

/// Default number of samples summed into the integral term.
pub const DEFAULT_WINDOW: usize = 21;

/// Steering output limit (normalized actuator range).
const STEER_LIMIT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// PID steering controller driven by cross-track error.
///
/// The integral term is the plain sum of the last `window_capacity` samples,
/// recomputed on every update, so old error falls out of it. The mean squared
/// error is a separate streaming mean over every sample since construction
/// and is what the tuner scores a trial by.
///
/// Gains are fixed for the controller's lifetime; a new gain vector means a
/// new `Controller`.
#[derive(Debug, Clone)]
pub struct Controller {
    gains: Gains,
    window: VecDeque<f64>,
    window_capacity: usize,
    prev_cte: f64,
    max_abs_cte: f64,
    mse: f64,
    iterations: u64,
}

impl Controller {
    /// Create a controller with the default integral window.
    pub fn new(gains: Gains) -> Self {
        Self::with_window(gains, DEFAULT_WINDOW)
    }

    /// Create a controller whose integral sums the last `window_capacity`
    /// samples. A capacity of zero is treated as one.
    pub fn with_window(gains: Gains, window_capacity: usize) -> Self {
        let window_capacity = window_capacity.max(1);
        Self {
            gains,
            window: VecDeque::with_capacity(window_capacity),
            window_capacity,
            prev_cte: 0.0,
            max_abs_cte: 0.0,
            mse: 0.0,
            iterations: 0,
        }
    }

    /// Feed one CTE sample and return the saturated steering command.
    pub fn update(&mut self, cte: f64) -> f64 {
        if self.window.len() == self.window_capacity {
            self.window.pop_front();
        }
        self.window.push_back(cte);

        let integral = self.integral();
        let derivative = cte - self.prev_cte;
        let raw = -self.gains.kp * cte - self.gains.kd * derivative - self.gains.ki * integral;

        self.prev_cte = cte;
        self.iterations += 1;
        self.mse += (cte * cte - self.mse) / self.iterations as f64;
        self.max_abs_cte = self.max_abs_cte.max(cte.abs());

        saturate(raw, STEER_LIMIT)
    }

    /// Streaming mean of squared CTE over every sample seen.
    pub fn mean_squared_error(&self) -> f64 {
        self.mse
    }

    /// Number of samples processed.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// CTE of the most recent sample (0 before the first).
    pub fn previous_cte(&self) -> f64 {
        self.prev_cte
    }

    /// Largest `|cte|` seen since construction.
    pub fn max_abs_cte(&self) -> f64 {
        self.max_abs_cte
    }

    /// Sum of the samples currently in the integral window.
    pub fn integral(&self) -> f64 {
        self.window.iter().sum()
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

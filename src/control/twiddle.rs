//! # Stage: Twiddle Tuner
//!
//! ## Responsibility
//! Coordinate-descent search over the three PID gains. Each trial runs a fresh
//! [`Controller`] for `trial_length` samples; its mean squared error decides
//! whether the gain under test is kept, probed in the opposite direction, or
//! restored with a narrower step before moving on to the next gain.
//!
//! ## Guarantees
//! - The coefficient under adjustment is always one of `kp`, `ki`, `kd`
//! - Step sizes only change by the 1.1 / 0.9 factors
//! - Once converged, gains and steps are frozen
//! - Pure arithmetic: no I/O, no error path
//!
//! ## NOT Responsible For
//! - Counting samples (the controller does; see [`Tuner::trial_complete`])
//! - Telling the simulator to reset (the session sends `reset`)

use super::bounds::step_sum;
use super::gains::{Coefficient, Gains};
use super::pid::Controller;

/// Step multiplier applied after an improvement.
const STEP_GROW: f64 = 1.1;
/// Step multiplier applied after both directions failed.
const STEP_SHRINK: f64 = 0.9;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Which way the current coefficient is being probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Gain was raised by one step for this trial.
    Expand,
    /// Gain was lowered by one step below its baseline for this trial.
    Contract,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Expand   => write!(f, "expand"),
            Direction::Contract => write!(f, "contract"),
        }
    }
}

/// Tuner state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerState {
    Probing {
        coefficient: Coefficient,
        direction: Direction,
    },
    /// Step sum fell below tolerance; gains are final.
    Converged,
}

/// What a completed trial did to the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// New best error; the step for that gain grew and the next gain is probed.
    Improved,
    /// Expanding did not help; the same gain is now probed one step below baseline.
    Reversed,
    /// Neither direction helped; the gain was restored, its step shrunk, and
    /// the next gain is probed.
    Abandoned,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Improved  => write!(f, "improved"),
            Transition::Reversed  => write!(f, "reversed"),
            Transition::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Summary of one tuner update, used for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    /// 0-based number of the trial just scored.
    pub trial: u64,
    /// Mean squared error of the trial just scored.
    pub error: f64,
    /// Best error after this update.
    pub best_error: f64,
    pub transition: Transition,
    /// Gains the next trial will run with.
    pub gains: Gains,
    /// Step sizes after this update.
    pub steps: [f64; 3],
    /// Whether this update converged the search.
    pub converged: bool,
}

// ---------------------------------------------------------------------------
// Tuner
// ---------------------------------------------------------------------------

/// Twiddle gain tuner.
///
/// Starts probing `kp` in the expand direction. The first trial always counts
/// as an improvement because `best_error` starts at `f64::MAX`. Improvement is
/// strict: a trial that ties the best error counts as a failure.
#[derive(Debug, Clone)]
pub struct Tuner {
    gains: Gains,
    steps: [f64; 3],
    state: TunerState,
    best_error: f64,
    trial_length: u64,
    tolerance: f64,
    trials: u64,
}

impl Tuner {
    /// Create a tuner starting from `gains` with per-gain `steps`.
    ///
    /// `trial_length` is the number of samples per trial; zero means no trial
    /// ever completes.
    pub fn new(gains: Gains, steps: [f64; 3], trial_length: u64, tolerance: f64) -> Self {
        Self {
            gains,
            steps,
            state: TunerState::Probing {
                coefficient: Coefficient::Proportional,
                direction: Direction::Expand,
            },
            best_error: f64::MAX,
            trial_length,
            tolerance,
            trials: 0,
        }
    }

    /// Create a tuner whose first trial is `kp = steps[0]`, `ki = kd = 0`.
    pub fn from_steps(steps: [f64; 3], trial_length: u64, tolerance: f64) -> Self {
        Self::new(Gains::new(steps[0], 0.0, 0.0), steps, trial_length, tolerance)
    }

    /// `true` when `controller` has run the full trial budget and the tuner
    /// is still searching.
    pub fn trial_complete(&self, controller: &Controller) -> bool {
        !self.is_converged()
            && self.trial_length > 0
            && controller.iterations() >= self.trial_length
    }

    /// Score a finished trial and move the search one step.
    ///
    /// Returns `None` once converged; gains and steps are not touched then.
    pub fn record_trial(&mut self, error: f64) -> Option<TrialOutcome> {
        let (coefficient, direction) = match self.state {
            TunerState::Probing { coefficient, direction } => (coefficient, direction),
            TunerState::Converged => return None,
        };
        let i = coefficient.index();

        let transition = if error < self.best_error {
            self.best_error = error;
            self.steps[i] *= STEP_GROW;
            self.probe_next(coefficient);
            Transition::Improved
        } else {
            match direction {
                Direction::Expand => {
                    self.gains[coefficient] -= 2.0 * self.steps[i];
                    self.state = TunerState::Probing {
                        coefficient,
                        direction: Direction::Contract,
                    };
                    Transition::Reversed
                }
                Direction::Contract => {
                    self.gains[coefficient] += self.steps[i];
                    self.steps[i] *= STEP_SHRINK;
                    self.probe_next(coefficient);
                    Transition::Abandoned
                }
            }
        };

        let converged = step_sum(&self.steps) < self.tolerance;
        if converged {
            self.state = TunerState::Converged;
        }

        let outcome = TrialOutcome {
            trial: self.trials,
            error,
            best_error: self.best_error,
            transition,
            gains: self.gains,
            steps: self.steps,
            converged,
        };
        self.trials += 1;
        Some(outcome)
    }

    /// Fresh controller for the next trial; nothing carries over.
    pub fn controller(&self, window_capacity: usize) -> Controller {
        Controller::with_window(self.gains, window_capacity)
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn steps(&self) -> [f64; 3] {
        self.steps
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    /// Best trial error so far (`f64::MAX` before the first trial).
    pub fn best_error(&self) -> f64 {
        self.best_error
    }

    pub fn trial_length(&self) -> u64 {
        self.trial_length
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of trials scored so far.
    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn is_converged(&self) -> bool {
        self.state == TunerState::Converged
    }

    fn probe_next(&mut self, current: Coefficient) {
        let next = current.next();
        self.gains[next] += self.steps[next.index()];
        self.state = TunerState::Probing {
            coefficient: next,
            direction: Direction::Expand,
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! # Module: control
//!
//! Steering control core: the windowed PID controller and the twiddle
//! coordinate-descent tuner that adjusts its gains between trials.
//!
//! Nothing in here performs I/O or returns an error; the boundary layer
//! (`protocol`, `session`, `server`) owns all fallibility.
//!
//! ## Sub-modules
//! - [`gains`]: the `(kp, ki, kd)` gain vector and its typed index
//! - [`pid`]: cross-track-error PID controller with a sliding integral window
//! - [`twiddle`]: trial-based gain auto-tuning state machine
//! - [`bounds`]: saturation, throttle law and step-sum helpers

pub mod bounds;
pub mod gains;
pub mod pid;
pub mod twiddle;

pub use bounds::{saturate, step_sum, Throttle};
pub use gains::{Coefficient, Gains};
pub use pid::{Controller, DEFAULT_WINDOW};
pub use twiddle::{Direction, TrialOutcome, Transition, Tuner, TunerState};

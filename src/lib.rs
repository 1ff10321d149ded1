//! PID steering controller for a path-following vehicle simulator.
//!
//! The simulator streams cross-track error over a WebSocket; each sample is
//! turned into a saturated steering command by a windowed PID
//! [`control::Controller`]. Optionally, a [`control::Tuner`] runs fixed-length
//! trials and tunes the three gains by coordinate descent ("twiddle"),
//! resetting the simulator between trials.
//!
//! ```rust
//! use pid_steering::control::{Controller, Gains};
//!
//! let mut pid = Controller::new(Gains::new(0.25, 0.0, 8.0));
//! let steer = pid.update(0.3);
//! assert!((-1.0..=1.0).contains(&steer));
//! ```

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

use tracing_subscriber::EnvFilter;

pub use config::Config;
pub use control::{Controller, Gains, Tuner};
pub use error::Error;
pub use session::Session;

/// Initialise the global tracing subscriber.
///
/// `LOG_FORMAT=json` selects JSON output; anything else gives human-readable
/// output. The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Returns [`Error::Tracing`] if a global subscriber is already set.
pub fn init_tracing() -> Result<(), Error> {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|e| Error::Tracing(e.to_string()))
}

//! Per-vehicle control session.
//!
//! A [`Session`] owns one [`Controller`] and, when tuning is enabled, one
//! [`Tuner`]. It turns inbound simulator frames into at most one outbound
//! [`Command`] each. Sessions are never shared between connections.

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::control::{Controller, Throttle, TunerState, Tuner};
use crate::error::ProtocolError;
use crate::protocol::{self, Command, Inbound, Telemetry};

pub struct Session {
    id: Uuid,
    controller: Controller,
    tuner: Option<Tuner>,
    window: usize,
    throttle: Throttle,
}

impl Session {
    /// Start a session from `config`.
    ///
    /// With a positive trial length the first trial runs
    /// `[initial_steps[0], 0, 0]`; otherwise the fixed controller gains are used.
    pub fn new(config: &Config) -> Self {
        let window = config.controller.window;
        let tuner = config.twiddle.enabled_trial_length().map(|trial_length| {
            Tuner::from_steps(config.twiddle.initial_steps, trial_length, config.twiddle.tolerance)
        });
        let controller = match &tuner {
            Some(t) => t.controller(window),
            None => Controller::with_window(config.controller.gains, window),
        };
        Self {
            id: Uuid::new_v4(),
            controller,
            tuner,
            window,
            throttle: config.throttle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The tuner, if tuning was enabled at startup (it stays available after
    /// convergence for inspection).
    pub fn tuner(&self) -> Option<&Tuner> {
        self.tuner.as_ref()
    }

    /// `true` while trials are still being run.
    pub fn tuning_active(&self) -> bool {
        self.tuner.as_ref().is_some_and(|t| !t.is_converged())
    }

    /// Handle one text frame from the simulator.
    ///
    /// - non-event frames produce nothing
    /// - event frames without data produce [`Command::Manual`]
    /// - telemetry produces [`Command::Steer`], or [`Command::Reset`] when it
    ///   closes a tuning trial
    pub fn handle_frame(&mut self, frame: &str) -> Result<Option<Command>, ProtocolError> {
        if !protocol::is_event_frame(frame) {
            return Ok(None);
        }
        let Some(payload) = protocol::extract_payload(frame) else {
            return Ok(Some(Command::Manual));
        };
        match protocol::decode_event(payload)? {
            Inbound::Telemetry(t) => Ok(Some(self.on_telemetry(t))),
            Inbound::Other(name) => {
                debug!(session = %self.id, event = %name, "ignoring event");
                Ok(None)
            }
        }
    }

    /// Process one telemetry sample.
    ///
    /// A sample that arrives once the trial budget is spent is not steered:
    /// it closes the trial, the controller is rebuilt with the next gains and
    /// the simulator is told to reset.
    pub fn on_telemetry(&mut self, telemetry: Telemetry) -> Command {
        if let Some(tuner) = self.tuner.as_mut() {
            if tuner.trial_complete(&self.controller) {
                let error = self.controller.mean_squared_error();
                let before = tuner.state();
                if let Some(outcome) = tuner.record_trial(error) {
                    let (coefficient, direction) = match before {
                        TunerState::Probing { coefficient, direction } => {
                            (coefficient.name(), direction.to_string())
                        }
                        TunerState::Converged => ("-", "-".to_string()),
                    };
                    info!(
                        target: "pid_steering::twiddle",
                        session = %self.id,
                        trial = outcome.trial,
                        coefficient,
                        direction = %direction,
                        error = outcome.error,
                        best_error = outcome.best_error,
                        transition = %outcome.transition,
                        next_gains = %outcome.gains,
                        steps = ?outcome.steps,
                        "Twiddle update"
                    );
                    if outcome.converged {
                        info!(
                            target: "pid_steering::twiddle",
                            session = %self.id,
                            gains = %outcome.gains,
                            steps = ?outcome.steps,
                            best_error = outcome.best_error,
                            "Twiddle finished"
                        );
                    }
                }
                self.controller = tuner.controller(self.window);
                return Command::Reset;
            }
        }

        let steering_angle = self.controller.update(telemetry.cte);
        let throttle = self
            .throttle
            .command(telemetry.cte, self.controller.max_abs_cte());
        Command::Steer { steering_angle, throttle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Gains;

    fn telemetry(cte: f64) -> Telemetry {
        Telemetry { cte, speed: 0.0, steering_angle: 0.0 }
    }

    fn tuning_config(trial_length: i64) -> Config {
        let mut c = Config::default();
        c.twiddle.trial_length = trial_length;
        c
    }

    #[test]
    fn test_fixed_gains_without_tuning() {
        let s = Session::new(&Config::default());
        assert!(s.tuner().is_none());
        assert!(!s.tuning_active());
        assert_eq!(s.controller().gains(), Gains::new(0.25, 0.0, 8.0));
    }

    #[test]
    fn test_tuning_starts_from_first_step() {
        let s = Session::new(&tuning_config(10));
        assert!(s.tuning_active());
        assert_eq!(s.controller().gains(), Gains::new(0.4, 0.0, 0.0));
    }

    #[test]
    fn test_non_event_frames_ignored() {
        let mut s = Session::new(&Config::default());
        assert_eq!(s.handle_frame("2").unwrap(), None);
        assert_eq!(s.handle_frame("40").unwrap(), None);
        assert_eq!(s.handle_frame("42").unwrap(), None);
    }

    #[test]
    fn test_null_payload_goes_manual() {
        let mut s = Session::new(&Config::default());
        assert_eq!(s.handle_frame(r#"42["telemetry",null]"#).unwrap(), Some(Command::Manual));
    }

    #[test]
    fn test_other_event_produces_nothing() {
        let mut s = Session::new(&Config::default());
        assert_eq!(s.handle_frame(r#"42["hello",{}]"#).unwrap(), None);
    }

    #[test]
    fn test_bad_telemetry_is_error_and_leaves_state() {
        let mut s = Session::new(&Config::default());
        assert!(s.handle_frame(r#"42["telemetry",{"cte":"x"}]"#).is_err());
        assert_eq!(s.controller().iterations(), 0);
    }

    #[test]
    fn test_first_telemetry_steers_and_throttles() {
        let mut s = Session::new(&Config::default());
        let cmd = s.handle_frame(r#"42["telemetry",{"cte":"1.0","speed":"0","steering_angle":"0"}]"#);
        // max_abs_cte is 1.0 after the update, so throttle is at its floor
        match cmd.unwrap() {
            Some(Command::Steer { steering_angle, throttle }) => {
                assert_eq!(steering_angle, -1.0);
                assert!((throttle - 0.01).abs() < 1e-12);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_cte_throttle_is_base() {
        let mut s = Session::new(&Config::default());
        match s.on_telemetry(telemetry(0.0)) {
            Command::Steer { steering_angle, throttle } => {
                assert_eq!(steering_angle, 0.0);
                assert_eq!(throttle, 0.5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_trial_end_sends_reset_and_rebuilds_controller() {
        let mut s = Session::new(&tuning_config(3));
        for _ in 0..3 {
            assert!(matches!(s.on_telemetry(telemetry(0.5)), Command::Steer { .. }));
        }
        assert_eq!(s.controller().iterations(), 3);

        assert_eq!(s.on_telemetry(telemetry(0.5)), Command::Reset);
        assert_eq!(s.controller().iterations(), 0);
        // first trial improves: kp step grows, ki probed upward
        assert_eq!(s.controller().gains().ki, 0.1);
        let tuner = s.tuner().unwrap();
        assert_eq!(tuner.trials(), 1);
        assert!((tuner.best_error() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_no_tuning_never_resets() {
        let mut s = Session::new(&Config::default());
        for _ in 0..500 {
            assert!(matches!(s.on_telemetry(telemetry(0.1)), Command::Steer { .. }));
        }
    }

    #[test]
    fn test_convergence_disables_tuning_and_keeps_gains() {
        let mut c = tuning_config(2);
        c.twiddle.initial_steps = [0.01, 0.01, 0.01];
        let mut s = Session::new(&c);
        s.on_telemetry(telemetry(0.2));
        s.on_telemetry(telemetry(0.2));
        assert_eq!(s.on_telemetry(telemetry(0.2)), Command::Reset);
        assert!(!s.tuning_active());
        let gains = s.controller().gains();

        for _ in 0..10 {
            assert!(matches!(s.on_telemetry(telemetry(0.2)), Command::Steer { .. }));
        }
        assert_eq!(s.controller().gains(), gains);
        assert_eq!(s.tuner().unwrap().gains(), gains);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = Session::new(&Config::default());
        let b = Session::new(&Config::default());
        assert_ne!(a.id(), b.id());
    }
}

//! Configuration loading and validation.
//!
//! ## Responsibility
//! Describe every tunable of the service, provide the stock defaults, read an
//! optional TOML file, and validate semantic constraints before the server
//! starts.
//!
//! ## Guarantees
//! - Every section is optional in the file; missing keys take their defaults
//! - Validation collects *all* violations before returning
//! - Error messages include the field path and the invalid value
//!
//! ## NOT Responsible For
//! - Command line parsing (that belongs to `cli`)
//!
//! ```toml
//! [server]
//! port = 4567
//!
//! [twiddle]
//! trial_length = 1500
//! initial_steps = [0.4, 0.1, 2.0]
//! tolerance = 0.1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control::{Gains, Throttle, DEFAULT_WINDOW};
use crate::error::ConfigError;

/// Port the simulator connects to.
pub const DEFAULT_PORT: u16 = 4567;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PID controller settings used when tuning is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Fixed gains.
    pub gains: Gains,
    /// Number of samples summed into the integral term.
    pub window: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            window: DEFAULT_WINDOW,
        }
    }
}

/// Twiddle tuning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwiddleConfig {
    /// Samples per trial. `<= 0` disables tuning.
    pub trial_length: i64,
    /// Starting step size per gain; the first trial runs `kp = initial_steps[0]`.
    pub initial_steps: [f64; 3],
    /// Tuning stops once the step sizes sum below this.
    pub tolerance: f64,
}

impl Default for TwiddleConfig {
    fn default() -> Self {
        Self {
            trial_length: -1,
            initial_steps: [0.4, 0.1, 2.0],
            tolerance: 0.1,
        }
    }
}

impl TwiddleConfig {
    /// Trial length as a sample count, or `None` when tuning is disabled.
    pub fn enabled_trial_length(&self) -> Option<u64> {
        u64::try_from(self.trial_length).ok().filter(|&n| n > 0)
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub twiddle: TwiddleConfig,
    pub throttle: Throttle,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load and validate a [`Config`] from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            file: path.display().to_string(),
            source: e,
        })?;
        Self::load_from_str(&content, &path.display().to_string())
    }

    /// Load and validate a [`Config`] from TOML text. `source_name` is used
    /// in error messages.
    pub fn load_from_str(content: &str, source_name: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            file: source_name.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints, reporting every violation at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.controller.window == 0 {
            errors.push(invalid("controller.window", self.controller.window, "must be >= 1"));
        }
        if !self.controller.gains.is_finite() {
            errors.push(invalid("controller.gains", self.controller.gains, "must be finite"));
        }
        for (i, step) in self.twiddle.initial_steps.iter().enumerate() {
            if !step.is_finite() || *step < 0.0 {
                errors.push(invalid(
                    &format!("twiddle.initial_steps[{i}]"),
                    step,
                    "must be finite and >= 0",
                ));
            }
        }
        if !self.twiddle.tolerance.is_finite() || self.twiddle.tolerance < 0.0 {
            errors.push(invalid("twiddle.tolerance", self.twiddle.tolerance, "must be finite and >= 0"));
        }
        if !self.throttle.epsilon.is_finite() || self.throttle.epsilon <= 0.0 {
            errors.push(invalid("throttle.epsilon", self.throttle.epsilon, "must be finite and > 0"));
        }
        if !self.throttle.fallback_max_cte.is_finite() || self.throttle.fallback_max_cte <= 0.0 {
            errors.push(invalid(
                "throttle.fallback_max_cte",
                self.throttle.fallback_max_cte,
                "must be finite and > 0",
            ));
        }
        if !self.throttle.base.is_finite() || !self.throttle.gain.is_finite() {
            errors.push(invalid(
                "throttle",
                format!("base={} gain={}", self.throttle.base, self.throttle.gain),
                "base and gain must be finite",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::Validation(errors)),
        }
    }
}

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.server.port, 4567);
        assert_eq!(c.server.addr(), "0.0.0.0:4567");
        assert_eq!(c.controller.window, 21);
        assert_eq!(c.controller.gains, Gains::new(0.25, 0.0, 8.0));
        assert_eq!(c.twiddle.initial_steps, [0.4, 0.1, 2.0]);
        assert_eq!(c.twiddle.tolerance, 0.1);
        assert_eq!(c.twiddle.enabled_trial_length(), None);
        assert_eq!(c.throttle.fallback_max_cte, 1000.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_enabled_trial_length() {
        let mut t = TwiddleConfig::default();
        t.trial_length = 0;
        assert_eq!(t.enabled_trial_length(), None);
        t.trial_length = -5;
        assert_eq!(t.enabled_trial_length(), None);
        t.trial_length = 1500;
        assert_eq!(t.enabled_trial_length(), Some(1500));
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let c = Config::load_from_str("", "empty").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_keys() {
        let c = Config::load_from_str(
            "[server]\nport = 9000\n\n[twiddle]\ntrial_length = 1500\n",
            "partial",
        )
        .unwrap();
        assert_eq!(c.server.port, 9000);
        assert_eq!(c.server.host, "0.0.0.0");
        assert_eq!(c.twiddle.enabled_trial_length(), Some(1500));
        assert_eq!(c.twiddle.tolerance, 0.1);
    }

    #[test]
    fn test_gains_table() {
        let c = Config::load_from_str(
            "[controller.gains]\nkp = 0.2\nki = 0.004\nkd = 3.0\n",
            "gains",
        )
        .unwrap();
        assert_eq!(c.controller.gains, Gains::new(0.2, 0.004, 3.0));
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = Config::load_from_str("[server\nport = ", "broken.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_single_violation_is_reported_directly() {
        let err = Config::load_from_str("[controller]\nwindow = 0\n", "w").unwrap_err();
        match err {
            ConfigError::InvalidField { field, .. } => assert_eq!(field, "controller.window"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_violations_collected() {
        let mut c = Config::default();
        c.controller.window = 0;
        c.twiddle.initial_steps = [-1.0, 0.1, f64::NAN];
        c.twiddle.tolerance = -0.5;
        c.throttle.epsilon = 0.0;
        match c.validate().unwrap_err() {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 5),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_throttle_bounds_reject_nan_and_infinity() {
        let mut c = Config::default();
        c.throttle.epsilon = f64::NAN;
        c.throttle.fallback_max_cte = f64::INFINITY;
        match c.validate().unwrap_err() {
            ConfigError::Validation(errors) => {
                let fields: Vec<String> = errors
                    .iter()
                    .filter_map(|e| match e {
                        ConfigError::InvalidField { field, .. } => Some(field.clone()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(fields, ["throttle.epsilon", "throttle.fallback_max_cte"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        c.throttle.fallback_max_cte = -1.0;
        c.throttle.epsilon = 1e-9;
        assert!(matches!(c.validate().unwrap_err(), ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[throttle]\nbase = 0.6\n").unwrap();
        let c = Config::load_from_file(f.path()).unwrap();
        assert_eq!(c.throttle.base, 0.6);
        assert_eq!(c.throttle.gain, 0.49);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load_from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "pid-steering")]
#[command(version)]
#[command(about = "PID steering controller for the path-following simulator, with twiddle gain tuning")]
pub struct Args {
    /// Samples per twiddle trial; <= 0 runs the fixed gains without tuning
    #[arg(allow_negative_numbers = true)]
    pub trial_length: Option<i64>,

    /// Optional TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port the simulator connects to
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Stop tuning once the step sizes sum below this
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Number of samples in the integral window
    #[arg(long)]
    pub window: Option<usize>,
}

impl Args {
    /// Load the config file (or defaults) and apply command line overrides.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };
        if let Some(n) = self.trial_length {
            config.twiddle.trial_length = n;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(tolerance) = self.tolerance {
            config.twiddle.tolerance = tolerance;
        }
        if let Some(window) = self.window {
            config.controller.window = window;
        }
        config.validate()?;
        Ok(config)
    }
}

use clap::Parser;

use pid_steering::cli::Args;
use pid_steering::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    pid_steering::init_tracing()?;

    let config = args.resolve_config()?;
    match config.twiddle.enabled_trial_length() {
        Some(trial_length) => tracing::info!(
            trial_length,
            steps = ?config.twiddle.initial_steps,
            tolerance = config.twiddle.tolerance,
            "Twiddle tuning enabled"
        ),
        None => tracing::info!(gains = %config.controller.gains, "Using fixed gains"),
    }

    if let Err(e) = server::serve(config).await {
        tracing::error!(error = %e, "Server stopped");
        return Err(e.into());
    }
    Ok(())
}

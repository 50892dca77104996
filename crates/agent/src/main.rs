//! `edgeguard` -- one-shot edge posture controller.
//!
//! Samples host health (load average, database liveness, free memory,
//! worker-process count), decides whether the Cloudflare posture should be
//! tightened or relaxed, and writes it only when it differs from what the
//! edge currently enforces. Meant to be run from cron or a systemd timer.
//!
//! # Environment variables
//!
//! See [`AgentConfig::from_env`] for the full table. Besides those:
//!
//! | Variable             | Default | Description                              |
//! |----------------------|---------|------------------------------------------|
//! | `EDGEGUARD_ENV_FILE` | --      | Env file to load instead of `./.env`     |
//! | `RUST_LOG`           | `edgeguard_agent=info,edgeguard_cloudflare=info` | Log filter |
//! | `LOG_FORMAT`         | text    | `json` for JSON log lines                |
//!
//! # Exit codes
//!
//! `0` no change or applied, `1` run failed, `2` invalid configuration.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edgeguard_agent::collector::SignalReader;
use edgeguard_agent::config::AgentConfig;
use edgeguard_agent::controller::{PostureController, RunOutcome};
use edgeguard_agent::remote::build_gateway;

const EXIT_RUN_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env_file = load_env_file();
    init_tracing();

    if let Err(e) = env_file {
        tracing::error!(error = %e, "Failed to load env file");
        return ExitCode::from(EXIT_CONFIG);
    }

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    tracing::debug!(
        control = %config.control,
        max_load = config.thresholds.max_load(),
        min_load = config.thresholds.min_load(),
        "Starting edgeguard run",
    );

    let signals = SignalReader::new(config.signals.clone());
    let gateway = build_gateway(&config.cloudflare);
    let controller = PostureController::new(&signals, gateway.as_ref(), &config.thresholds);

    match controller.run().await {
        Ok(RunOutcome::NoChange(reason)) => {
            tracing::debug!(?reason, "Run finished without change");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Applied { target, .. }) => {
            tracing::debug!(%target, "Run finished with update");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}

/// Load `EDGEGUARD_ENV_FILE` if set, else an optional `./.env`.
fn load_env_file() -> Result<(), dotenvy::Error> {
    match std::env::var_os("EDGEGUARD_ENV_FILE") {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    }
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgeguard_agent=info,edgeguard_cloudflare=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

//! valleycast command-line entry point.
//!
//! Loads settings, connects to OBS, runs one command, and exits. `watch`
//! stays connected, runs the session-start check, and logs events until
//! Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config / CLI overrides
//!  └─ ObsController::connect()      -- socket, handshake, reconnect policy
//!  └─ wait_until_connected()
//!  └─ command
//!       ├─ status / start / stop / restart -> RecordingControl
//!       └─ watch                           -> RecordingSession + event log
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use valleycast::application::recording::RecordingCommands;
use valleycast::application::session::{RecordingSession, RestartCadence};
use valleycast::infrastructure::network::{ControllerConfig, ObsController};
use valleycast::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config_to, AppConfig,
};
use valleycast::infrastructure::ui_bridge::{CommandResult, ConsoleNotifier, ControllerStatusDto};
use valleycast_core::ObsEvent;

#[derive(Debug, Parser)]
#[command(name = "valleycast", version, about = "Control OBS recording over obs-websocket v5")]
struct Cli {
    /// Settings file; defaults to the platform config directory.
    #[arg(long, global = true, env = "VALLEYCAST_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "VALLEYCAST_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "VALLEYCAST_PORT")]
    port: Option<u16>,

    #[arg(long, global = true, env = "VALLEYCAST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, global = true, env = "VALLEYCAST_RECONNECT_ATTEMPTS")]
    reconnect_attempts: Option<u32>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show connection and recording state.
    Status,
    /// Start recording.
    Start,
    /// Stop recording and wait until OBS confirms.
    Stop,
    /// Stop, then start a new recording file.
    Restart,
    /// Stay connected, check the recording, and log OBS events.
    Watch {
        /// Treat startup as the start of this in-game day (1-based) instead
        /// of a freshly loaded save.
        #[arg(long)]
        day: Option<u32>,

        /// Overrides `restart_cadence` from the settings file.
        #[arg(long)]
        cadence: Option<RestartCadence>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("locating settings file")?,
    };
    let mut config = if cli.config.is_some() {
        load_config_from(&config_path)
    } else {
        load_config()
    }
    .with_context(|| format!("loading settings from {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    if config.first_load {
        config.first_load = false;
        save_config_to(&config_path, &config)
            .with_context(|| format!("writing settings to {}", config_path.display()))?;
        info!("wrote default settings to {}", config_path.display());
    }

    apply_overrides(&mut config, &cli);
    info!("valleycast starting, OBS at {}", config.websocket_url());

    let controller = ObsController::new(
        ControllerConfig::from(&config),
        Arc::new(ConsoleNotifier::new()),
    );
    controller.connect();

    let wait = Duration::from_millis(config.request_timeout_ms);
    if !controller.wait_until_connected(wait).await {
        if cli.json {
            print_json(&CommandResult::<()>::err(format!(
                "could not connect to OBS at {}",
                config.websocket_url()
            )))?;
        }
        bail!("could not connect to OBS at {} within {wait:?}", config.websocket_url());
    }

    let recording = controller.recording();
    match cli.command {
        Command::Status => {
            let result = recording.get_record_status().await;
            if cli.json {
                print_json(&CommandResult::from(
                    result.map(|_| ControllerStatusDto::snapshot(&controller)),
                ))?;
            } else {
                let recording = result.context("querying recording status")?;
                println!(
                    "OBS {} ({})",
                    if recording { "is recording" } else { "is not recording" },
                    controller.config().url
                );
            }
        }
        Command::Start => report(cli.json, recording.start_recording().await, "starting recording")?,
        Command::Stop => report(cli.json, recording.stop_recording().await, "stopping recording")?,
        Command::Restart => {
            report(cli.json, recording.restart_recording().await, "restarting recording")?
        }
        Command::Watch { day, cadence } => {
            let cadence = cadence.unwrap_or(config.restart_cadence);
            watch(&controller, cadence, day).await;
        }
    }

    controller.close();
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }
    if let Some(attempts) = cli.reconnect_attempts {
        config.reconnect_attempts = attempts;
    }
}

fn report<T, E>(json: bool, result: Result<T, E>, action: &'static str) -> anyhow::Result<()>
where
    T: Serialize + std::fmt::Debug,
    E: std::error::Error + Send + Sync + 'static,
{
    if json {
        return print_json(&CommandResult::from(result));
    }
    let value = result.context(action)?;
    println!("{action}: ok ({value:?})");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn watch(controller: &ObsController, cadence: RestartCadence, day: Option<u32>) {
    let session = RecordingSession::new(
        Arc::new(controller.recording()),
        Arc::new(ConsoleNotifier::new()),
        cadence,
    );
    let mut events = controller.subscribe();

    let check = match day {
        Some(day) => session.on_day_started(day).await,
        None => session.on_save_loaded().await,
    };
    info!("session check: {check:?} (restart cadence {})", session.cadence());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Ok(ObsEvent::RecordStateChanged(change)) => info!(
                    "recording {} ({})",
                    if change.output_active { "active" } else { "inactive" },
                    change.output_state
                ),
                Ok(ObsEvent::ExitStarted) => warn!("OBS is shutting down"),
                Ok(ObsEvent::Other { event_type, .. }) => info!("event: {event_type}"),
                Err(RecvError::Lagged(skipped)) => warn!("event log skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

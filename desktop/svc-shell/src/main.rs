mod cli;
mod control;
mod logging;
mod relay;

use cli::Cli;
use logging::{current_log_path, setup_logging};

#[cfg(test)]
mod tests;

use svc_supervisor::{
    BackendCommand, LifecycleCoordinator, LifecycleEvent, LockFile, ProcessSupervisor, QuitPolicy,
    StatusChannel, SupervisorConfig, SupervisorResult,
};

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

const EVENT_QUEUE_DEPTH: usize = 16;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = std::fs::create_dir_all(&cli.data_dir) {
        eprintln!("Cannot create data directory {}: {e}", cli.data_dir.display());
        return ExitCode::FAILURE;
    }

    // Config comes first: it names the log directory
    let (config, base_dir) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Config error: {e}\n{}", e.recovery_hint());
            return ExitCode::FAILURE;
        }
    };

    let logs_dir = cli.data_dir.join(&config.logging.directory);
    if let Err(e) = setup_logging(&logs_dir, &config.logging.level) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting svc-shell v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", cli.data_dir);

    let lock = match LockFile::acquire(&cli.data_dir) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{e}");
            eprintln!("{}", e.recovery_hint());
            return ExitCode::FAILURE;
        }
    };

    let command = BackendCommand::from_settings(&config.backend, &base_dir);
    let (status, status_rx) = StatusChannel::new();
    let supervisor = ProcessSupervisor::new(config, command, status);

    let relay = tokio::spawn(relay::relay_status(status_rx, cli.json));
    let tracker = tokio::spawn(relay::track_state(supervisor.subscribe(), lock));

    // A headless host is "ready" as soon as its wiring is in place; queued
    // ahead of any control input so an immediate EOF still starts first
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    if events_tx.send(LifecycleEvent::AppReady).await.is_err() {
        return ExitCode::FAILURE;
    }
    control::forward_signals(events_tx.clone());
    control::forward_stdin(events_tx);

    let coordinator = LifecycleCoordinator::new(supervisor, QuitPolicy::for_platform());
    let report = coordinator.run(events_rx).await;

    // Supervisor is gone: both relays drain and finish
    tracker.await.ok();
    relay.await.ok();

    if report.start_failed() {
        if let Some(e) = &report.start_error {
            error!("Backend never became ready: {e}");
        }
        error!("See {} for details", current_log_path(&logs_dir).display());
        return ExitCode::FAILURE;
    }

    info!("Shut down cleanly");
    ExitCode::SUCCESS
}

/// Resolve the config and the directory relative backend paths hang off.
fn load_config(cli: &Cli) -> SupervisorResult<(SupervisorConfig, PathBuf)> {
    let (mut config, base_dir) = match &cli.config {
        Some(path) => {
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (SupervisorConfig::load(path)?, base)
        }
        None => (
            SupervisorConfig::load_or_create(&cli.data_dir)?,
            cli.data_dir.clone(),
        ),
    };

    if let Some(port) = cli.preferred_port {
        config.network.preferred_port = port;
        config.validate()?;
    }

    Ok((config, base_dir))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access Bot Daemon (abd)
//!
//! Watches the access-control change stream, accepts platform callbacks on
//! a Unix socket and reconciles both into per-request records.

use std::path::PathBuf;

use ab_daemon::{lifecycle, Config, LifecycleError};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "abd", version, about = "Access request bot daemon")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short)]
    config: PathBuf,

    /// Parse and validate the configuration, then exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    if args.validate {
        println!("{}: ok", args.config.display());
        return Ok(());
    }

    let log_guard = setup_logging(&config)?;
    info!(config = %args.config.display(), "starting abd");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let daemon = tokio::select! {
        result = lifecycle::startup(&config) => match result {
            Ok(daemon) => daemon,
            Err(e) => {
                error!(error = %e, "failed to start daemon");
                drop(log_guard);
                return Err(e.into());
            }
        },
        _ = sigterm.recv() => {
            info!("received SIGTERM during startup");
            return Ok(());
        }
        _ = sigint.recv() => {
            info!("received SIGINT during startup");
            return Ok(());
        }
    };

    // Signal ready for parent process (e.g., systemd, test harness)
    println!("READY");
    info!(socket = %config.socket_path.display(), "daemon ready");

    let reason = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
        _ = daemon.shutdown_requested.cancelled() => "client request",
        _ = daemon.app.supervisor().wait() => "critical task ended",
    };
    info!(reason, "stopping");
    for task in [&daemon.watcher, &daemon.server] {
        match task.outcome() {
            Some(Ok(())) => info!(task = task.name(), "task ended"),
            Some(Err(e)) => info!(task = task.name(), error = %e, "task ended"),
            None => {}
        }
    }

    match daemon.shutdown().await {
        Ok(()) => {
            info!("daemon stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "daemon stopped with error");
            drop(log_guard);
            Err(e.into())
        }
    }
}

fn setup_logging(
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = &config.log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) else {
        return Err(LifecycleError::Invalid(format!(
            "log_path {} is not a file path",
            log_path.display()
        )));
    };
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}

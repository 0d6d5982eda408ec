//! The two scheduler entrypoints, embedded so downstream binaries keep the
//! dispatcher external: delegate `main` to [`run`] and the master's
//! self-spawned `unit` passes resolve through the same executable.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::ForemanError;
use crate::master::MasterOutcome;
use crate::scheduler::Scheduler;
use crate::unit::UnitKind;

#[derive(Debug, Parser)]
#[command(name = "foreman", about = "Master/worker job scheduler on Redis")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the master supervision loop on this host. The queue namespace
    /// comes from the configuration; `go` takes no arguments of its own.
    Go,
    /// Run one unit pass. Spawned by the master; rarely typed by hand.
    Unit {
        #[arg(long = "type", value_enum)]
        kind: UnitKind,
        /// Queue namespace the unit works on.
        #[arg(long)]
        name: String,
    },
}

/// Parses `std::env::args` and drives the requested component. Completes
/// cleanly when a master loses the `SETNX` race; Redis failures come back
/// as errors for the caller's `main` to report with a non-zero exit.
pub async fn run(config: Config, dispatcher: Arc<dyn Dispatcher>) -> Result<(), ForemanError> {
    run_with(Cli::parse(), config, dispatcher).await
}

async fn run_with(
    cli: Cli,
    config: Config,
    dispatcher: Arc<dyn Dispatcher>,
) -> Result<(), ForemanError> {
    match cli.command {
        Command::Go => {
            let scheduler = Scheduler::new(config, dispatcher)?;
            let master = scheduler.master();

            let cancel = master.cancel_token();
            tokio::spawn(async move {
                if shutdown_signal().await.is_ok() {
                    cancel.cancel();
                }
            });

            if master.run().await? == MasterOutcome::AlreadyRunning {
                println!("Already running!");
            }
            Ok(())
        }
        Command::Unit { kind, name } => {
            let scheduler = Scheduler::new(config.queue_name(name), dispatcher)?;
            match kind {
                UnitKind::Delay => {
                    scheduler.materializer().sweep().await?;
                }
                UnitKind::Realtime => {
                    scheduler.unit().run().await?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
async fn shutdown_signal() -> Result<(), std::io::Error> {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = ctrl_c => Ok(()),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
async fn shutdown_signal() -> Result<(), std::io::Error> {
    tokio::signal::ctrl_c().await
}

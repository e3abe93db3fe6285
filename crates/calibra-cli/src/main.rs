//! Scheduler entry point.
//!
//! An external scheduler invokes `calibra run-cycle` on a fixed cadence;
//! the process exits non-zero only on batch-level failure. Per-experiment
//! failures are absorbed into the cycle summary and the experiments'
//! `notes`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use calibra_controller::RolloutController;
use calibra_core::config::CalibraConfig;
use calibra_core::time::{unix_now, SECS_PER_DAY};
use calibra_core::traits::storage::IAccuracyStore;
use calibra_storage::CalibraStorageEngine;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "calibra",
    about = "Self-tuning forecast ensemble: canary evaluation & rollout",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate every running ensemble experiment once.
    RunCycle {
        /// Print the cycle summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Delete accuracy records older than the retention horizon.
    Prune {
        /// Retention horizon in days (overrides the config file).
        #[arg(long)]
        keep_days: Option<i64>,
    },
}

fn main() -> ExitCode {
    calibra_core::tracing::init_tracing("info");
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "calibra failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => CalibraConfig::from_toml_file(path)?,
        None => CalibraConfig::default(),
    };
    let db_path = cli
        .db
        .or_else(|| config.db_path.clone().map(PathBuf::from))
        .ok_or("no database path: pass --db or set db_path in the config file")?;
    let store = Arc::new(CalibraStorageEngine::open(&db_path)?);

    match cli.command {
        Command::RunCycle { json } => {
            let controller = RolloutController::new(store, config.policy.clone());
            let summary = controller.run_cycle()?;
            info!(
                seen = summary.experiments_seen(),
                rolled_out = summary.rolled_out(),
                rolled_back = summary.rolled_back(),
                skipped = summary.skipped(),
                failed = summary.failed(),
                "cycle finished"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Command::Prune { keep_days } => {
            let days = keep_days.unwrap_or_else(|| config.effective_accuracy_retention_days());
            let cutoff = unix_now() - days * SECS_PER_DAY;
            let deleted = store.prune_accuracy_before(cutoff)?;
            info!(deleted, keep_days = days, "pruned accuracy records");
        }
    }
    Ok(())
}

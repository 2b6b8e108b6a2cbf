mod cli;
mod pipeline;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use jobmig_core::{config, format_cycle, Config};
use jobmig_ingest::{ExtensionDecoder, IngestCoordinator};

use crate::cli::{CliArgs, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    config::load_dotenv();
    let args = CliArgs::parse();

    let mut config = Config::from_env();
    if let Some(workers) = args.workers {
        config.ingest.worker_threads = workers;
    }
    if let Some(secs) = args.shutdown_grace_secs {
        config.ingest.shutdown_grace_secs = secs;
    }
    config.log_summary();

    let coordinator = IngestCoordinator::new(Arc::new(ExtensionDecoder::new()), &config.ingest)
        .context("failed to start ingestion pool")?;

    let outcome = run(&coordinator, args.command);

    if !coordinator.shutdown() {
        warn!("ingestion pool did not drain before exit");
    }
    outcome
}

fn run(coordinator: &IngestCoordinator, command: Command) -> Result<()> {
    match command {
        Command::Convert {
            primary,
            secondary,
            out,
        } => {
            let report = pipeline::migrate(coordinator, &primary, &secondary)
                .context("migration failed")?;
            for e in &report.file_errors {
                warn!(path = %e.path.display(), error = %e.message, "skipped source file");
            }
            emit(&report, out.as_deref())?;
            info!(jobs = report.jobs.len(), skipped_files = report.file_errors.len(), "convert done");
            Ok(())
        }
        Command::Check { files } => {
            let report = pipeline::check(coordinator, &files).context("check failed")?;
            for e in &report.file_errors {
                warn!(path = %e.path.display(), error = %e.message, "skipped source file");
            }
            for cycle in &report.cycles {
                println!("cycle: {}", format_cycle(cycle));
            }
            if !report.cycles.is_empty() {
                bail!(
                    "{} circular dependenc{} among {} jobs",
                    report.cycles.len(),
                    if report.cycles.len() == 1 { "y" } else { "ies" },
                    report.jobs
                );
            }
            println!("no circular dependencies among {} jobs", report.jobs);
            Ok(())
        }
    }
}

fn emit<T: Serialize>(report: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    match out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

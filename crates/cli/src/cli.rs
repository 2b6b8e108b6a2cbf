use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Migrate job definitions from legacy exports into the target scheduler format.
///
/// Source files are decoded in parallel, reconciled across sources, checked
/// for circular dependencies and written out as a JSON report.
#[derive(Parser, Debug)]
#[command(name = "jobmig", about = "Legacy job definition migrator")]
pub struct CliArgs {
    /// Ingestion worker threads (0 = available parallelism)
    #[arg(long, global = true, env = "JOBMIG_WORKER_THREADS")]
    pub workers: Option<usize>,

    /// Seconds to wait for in-flight files on shutdown
    #[arg(long, global = true, env = "JOBMIG_SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile and transform source files into the target format
    Convert {
        /// Authoritative source files
        #[arg(long, num_args = 1.., required = true)]
        primary: Vec<PathBuf>,

        /// Gap-filling source files, checked against the primary
        #[arg(long, num_args = 1..)]
        secondary: Vec<PathBuf>,

        /// Report destination (stdout when absent)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Ingest files and report circular dependencies
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

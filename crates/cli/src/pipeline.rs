//! End-to-end migration: ingest, reconcile, gate on cycles, transform.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use jobmig_core::{CyclePath, JobRecord, Result, TargetJob};
use jobmig_graph::detect_cycles;
use jobmig_ingest::{FileError, IngestCoordinator, ParseOutcome};
use jobmig_mapper::{reconcile, to_target};

/// A file that could not be ingested, as written to the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedFileError {
    pub path: PathBuf,
    pub message: String,
}

impl From<&FileError> for ReportedFileError {
    fn from(e: &FileError) -> Self {
        Self {
            path: e.path.clone(),
            message: e.error.to_string(),
        }
    }
}

/// Output of a `convert` run.
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub generated_at: DateTime<Utc>,
    pub jobs: Vec<TargetJob>,
    pub file_errors: Vec<ReportedFileError>,
}

/// Output of a `check` run.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub jobs: usize,
    pub cycles: Vec<CyclePath>,
    pub file_errors: Vec<ReportedFileError>,
}

fn ingest<P: AsRef<Path>>(
    coordinator: &IngestCoordinator,
    paths: &[P],
    file_errors: &mut Vec<ReportedFileError>,
) -> Result<Vec<JobRecord>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let ParseOutcome { jobs, errors, .. } = coordinator.parse_many(paths)?;
    file_errors.extend(errors.iter().map(ReportedFileError::from));
    Ok(jobs)
}

/// Run the full migration over two source groups.
///
/// Unreadable or invalid files are listed in the report and skipped.
/// Contradictions between the groups and circular dependencies abort the run.
pub fn migrate<P: AsRef<Path>>(
    coordinator: &IngestCoordinator,
    primary: &[P],
    secondary: &[P],
) -> Result<MigrationReport> {
    let mut file_errors = Vec::new();
    let primary_jobs = ingest(coordinator, primary, &mut file_errors)?;
    let secondary_jobs = ingest(coordinator, secondary, &mut file_errors)?;

    let merged = if secondary.is_empty() {
        primary_jobs
    } else {
        reconcile(&primary_jobs, &secondary_jobs)?
    };

    let jobs = to_target(&merged)?;
    info!(jobs = jobs.len(), file_errors = file_errors.len(), "migration finished");

    Ok(MigrationReport {
        generated_at: Utc::now(),
        jobs,
        file_errors,
    })
}

/// Ingest `paths` and list every cycle in the combined job set.
pub fn check<P: AsRef<Path>>(coordinator: &IngestCoordinator, paths: &[P]) -> Result<CheckReport> {
    let mut file_errors = Vec::new();
    let jobs = ingest(coordinator, paths, &mut file_errors)?;
    let cycles = detect_cycles(&jobs);

    Ok(CheckReport {
        jobs: jobs.len(),
        cycles,
        file_errors,
    })
}

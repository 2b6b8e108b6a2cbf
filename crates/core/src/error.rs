use std::path::PathBuf;

use thiserror::Error;

use crate::model::{format_cycle, CyclePath, JobId, ReconciliationConflict};

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable source file.
    #[error("Decode error in {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// Structural defects in a decoded job list (missing fields, duplicate ids, ...).
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Never constructed with an empty list.
    #[error("{}", contradiction_message(.0))]
    ContradictionDetected(Vec<ReconciliationConflict>),

    #[error("Circular dependency detected, cycle path: {}", format_cycle(.0))]
    CycleDetected(CyclePath),

    #[error("Ingestion pool is shut down")]
    PoolShutDown,

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("Worker terminated before reporting a result for {}", .0.display())]
    WorkerLost(PathBuf),
}

impl MigrationError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MigrationError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Conflicts carried by a `ContradictionDetected` error.
    pub fn conflicts(&self) -> &[ReconciliationConflict] {
        match self {
            MigrationError::ContradictionDetected(conflicts) => conflicts,
            _ => &[],
        }
    }

    /// Cycle carried by a `CycleDetected` error.
    pub fn cycle(&self) -> Option<&[JobId]> {
        match self {
            MigrationError::CycleDetected(path) => Some(path),
            _ => None,
        }
    }
}

fn contradiction_message(conflicts: &[ReconciliationConflict]) -> String {
    match conflicts.first() {
        Some(first) => format!(
            "Data reconciliation found {} contradiction(s); first: {}",
            conflicts.len(),
            first
        ),
        None => "Data reconciliation found contradictions".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contradiction_message_names_first_conflict() {
        let err = MigrationError::ContradictionDetected(vec![
            ReconciliationConflict {
                job_id: 4100,
                source_a: "a.json".into(),
                source_b: "b.yaml".into(),
                description: "Dependencies differ: [3200] vs [2001]".into(),
            },
            ReconciliationConflict {
                job_id: 5000,
                source_a: "a.json".into(),
                source_b: "b.yaml".into(),
                description: "Job name differs: 'x' vs 'y'".into(),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.contains("2 contradiction(s)"), "{msg}");
        assert!(msg.contains("job 4100"), "{msg}");
        assert!(msg.contains("[3200] vs [2001]"), "{msg}");
        assert_eq!(err.conflicts().len(), 2);
    }

    #[test]
    fn cycle_message_shows_path() {
        let err = MigrationError::CycleDetected(vec![1, 2, 1]);
        assert_eq!(err.to_string(), "Circular dependency detected, cycle path: 1 -> 2 -> 1");
        assert_eq!(err.cycle(), Some(&[1, 2, 1][..]));
        assert!(err.conflicts().is_empty());
    }
}

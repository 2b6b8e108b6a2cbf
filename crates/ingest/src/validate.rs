use std::collections::HashSet;

use jobmig_core::{JobRecord, MigrationError, Result};

/// Structural checks on one decoded file.
///
/// Collects every defect (blank name, duplicate id, dependency without a
/// target) and reports them together. An empty list is rejected as well.
pub fn validate_structure(jobs: &[JobRecord]) -> Result<()> {
    if jobs.is_empty() {
        return Err(MigrationError::Validation(vec!["no jobs found in data".to_string()]));
    }

    let mut seen = HashSet::with_capacity(jobs.len());
    let mut defects = Vec::new();

    for job in jobs {
        if job.name.trim().is_empty() {
            defects.push(format!("job {} missing required field: job_name", job.id));
        }
        if !seen.insert(job.id) {
            defects.push(format!("duplicate job_id found: {}", job.id));
        }
        if job.dependencies.iter().any(|d| d.target_id.is_none()) {
            defects.push(format!("job {} has dependency with null job_id", job.id));
        }
    }

    if defects.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::Validation(defects))
    }
}

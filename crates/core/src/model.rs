use std::fmt;

use serde::{Deserialize, Serialize};

/// Job identifier, unique within a reconciled job set.
pub type JobId = i64;

/// A job definition as produced by a source decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Source tag (usually the file path). Diagnostics only, never identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl JobRecord {
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            dependencies: Vec::new(),
            notes: None,
            origin: None,
        }
    }

    /// Builder-style helper: add a dependency on `target`.
    pub fn depends_on(mut self, target: JobId) -> Self {
        self.dependencies.push(DependencyRef::on(target));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Declared dependency targets, skipping refs with no target.
    pub fn dependency_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.dependencies.iter().filter_map(|d| d.target_id)
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} '{}' ({} deps, origin: {})",
            self.id,
            self.name,
            self.dependencies.len(),
            self.origin.as_deref().unwrap_or("-")
        )
    }
}

/// Reference from a dependent job to the job it waits on.
///
/// A `None` target never produces a graph edge; only the decoders'
/// structural validation treats it as a defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub target_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DependencyRef {
    pub fn on(target: JobId) -> Self {
        Self {
            target_id: Some(target),
            status: None,
        }
    }

    pub fn with_status(target: JobId, status: impl Into<String>) -> Self {
        Self {
            target_id: Some(target),
            status: Some(status.into()),
        }
    }
}

/// How the downstream scheduler starts a migrated job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerMode {
    #[default]
    Manual,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Manual => write!(f, "MANUAL"),
        }
    }
}

/// A job in the target scheduling format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetJob {
    pub id: JobId,
    pub name: String,
    /// Only ids that exist in the same job set.
    pub dependency_ids: Vec<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub trigger_mode: TriggerMode,
}

/// Walkable cycle: consecutive ids share an edge, first id repeats as last.
pub type CyclePath = Vec<JobId>;

/// Render a cycle as `a -> b -> a`.
pub fn format_cycle(path: &[JobId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A job present in both sources whose name or dependency set disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConflict {
    pub job_id: JobId,
    pub source_a: String,
    pub source_b: String,
    pub description: String,
}

impl fmt::Display for ReconciliationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} ({} vs {}): {}",
            self.job_id, self.source_a, self.source_b, self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_ids_skip_missing_targets() {
        let mut job = JobRecord::new(1, "extract").depends_on(2);
        job.dependencies.push(DependencyRef {
            target_id: None,
            status: Some("Success".into()),
        });
        job.dependencies.push(DependencyRef::with_status(3, "Success"));

        let ids: Vec<JobId> = job.dependency_ids().collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn trigger_mode_serializes_uppercase() {
        let json = serde_json::to_string(&TriggerMode::Manual).unwrap();
        assert_eq!(json, "\"MANUAL\"");
        assert_eq!(TriggerMode::default().to_string(), "MANUAL");
    }

    #[test]
    fn format_cycle_joins_with_arrows() {
        assert_eq!(format_cycle(&[2001, 4100, 2001]), "2001 -> 4100 -> 2001");
        assert_eq!(format_cycle(&[]), "");
    }
}

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use jobmig_core::{JobId, JobRecord, MigrationError, ReconciliationConflict, Result};

const PRIMARY_LABEL: &str = "primary";
const SECONDARY_LABEL: &str = "secondary";

/// Merge two job sources where `primary` is authoritative.
///
/// Every primary job is kept. Secondary jobs fill gaps for ids the primary
/// lacks. A job present in both must agree on name and on its set of
/// dependency ids; otherwise the disagreement is recorded and, after the
/// whole secondary set has been compared, the merge fails with every
/// conflict attached. The secondary never overwrites the primary.
///
/// Output order: primary jobs in their original order, then secondary-only
/// jobs in secondary order.
pub fn reconcile(primary: &[JobRecord], secondary: &[JobRecord]) -> Result<Vec<JobRecord>> {
    let mut merged: IndexMap<JobId, &JobRecord> = IndexMap::with_capacity(primary.len() + secondary.len());
    for job in primary {
        merged.insert(job.id, job);
    }

    let mut conflicts = Vec::new();
    let mut filled = 0usize;

    for candidate in secondary {
        match merged.get(&candidate.id) {
            None => {
                merged.insert(candidate.id, candidate);
                filled += 1;
            }
            Some(existing) => {
                if let Some(conflict) = compare(existing, candidate) {
                    debug!(job_id = candidate.id, description = %conflict.description, "contradiction");
                    conflicts.push(conflict);
                }
            }
        }
    }

    if !conflicts.is_empty() {
        warn!(conflicts = conflicts.len(), "reconciliation blocked by contradictions");
        return Err(MigrationError::ContradictionDetected(conflicts));
    }

    info!(
        primary = primary.len(),
        filled_from_secondary = filled,
        total = merged.len(),
        "sources reconciled"
    );
    Ok(merged.into_values().cloned().collect())
}

/// Compare the two definitions of one job on name and dependency-id set.
fn compare(a: &JobRecord, b: &JobRecord) -> Option<ReconciliationConflict> {
    let mut differences = Vec::new();

    if a.name != b.name {
        differences.push(format!("Job name differs: '{}' vs '{}'", a.name, b.name));
    }

    let deps_a: BTreeSet<JobId> = a.dependency_ids().collect();
    let deps_b: BTreeSet<JobId> = b.dependency_ids().collect();
    if deps_a != deps_b {
        differences.push(format!("Dependencies differ: {:?} vs {:?}", deps_a, deps_b));
    }

    if differences.is_empty() {
        return None;
    }

    Some(ReconciliationConflict {
        job_id: a.id,
        source_a: a.origin.clone().unwrap_or_else(|| PRIMARY_LABEL.to_string()),
        source_b: b.origin.clone().unwrap_or_else(|| SECONDARY_LABEL.to_string()),
        description: differences.join("; "),
    })
}

#[cfg(test)]
mod tests {
    use jobmig_core::DependencyRef;

    use super::*;

    fn job(id: JobId, name: &str, deps: &[JobId], origin: &str) -> JobRecord {
        deps.iter()
            .fold(JobRecord::new(id, name), |j, &d| j.depends_on(d))
            .with_origin(origin)
    }

    fn conflicts_of(result: Result<Vec<JobRecord>>) -> Vec<ReconciliationConflict> {
        match result {
            Err(MigrationError::ContradictionDetected(c)) => c,
            other => panic!("expected ContradictionDetected, got {other:?}"),
        }
    }

    #[test]
    fn empty_secondary_is_identity() {
        let a = vec![
            job(3, "c", &[1], "a.json"),
            job(1, "a", &[], "a.json"),
            job(2, "b", &[1, 3], "a.json"),
        ];
        assert_eq!(reconcile(&a, &[]).unwrap(), a);
    }

    #[test]
    fn empty_primary_takes_secondary() {
        let b = vec![job(5, "e", &[], "b.yaml"), job(4, "d", &[5], "b.yaml")];
        assert_eq!(reconcile(&[], &b).unwrap(), b);
    }

    #[test]
    fn secondary_only_jobs_are_appended_in_order() {
        let a = vec![job(1, "a", &[], "a.json")];
        let b = vec![job(9, "z", &[], "b.yaml"), job(1, "a", &[], "b.yaml"), job(7, "y", &[9], "b.yaml")];

        let ids: Vec<JobId> = reconcile(&a, &b).unwrap().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 9, 7]);
    }

    #[test]
    fn dependency_order_and_status_are_ignored() {
        let mut a = job(1, "a", &[], "a.json");
        a.dependencies = vec![DependencyRef::with_status(3, "Success"), DependencyRef::on(2)];
        let b = job(1, "a", &[2, 3, 3], "b.yaml");

        let merged = reconcile(&[a.clone()], &[b]).unwrap();
        assert_eq!(merged, vec![a]);
    }

    #[test]
    fn empty_dependency_targets_are_ignored_in_comparison() {
        let mut a = job(1, "a", &[2], "a.json");
        a.dependencies.push(DependencyRef {
            target_id: None,
            status: None,
        });
        assert!(reconcile(&[a], &[job(1, "a", &[2], "b.yaml")]).is_ok());
    }

    #[test]
    fn differing_dependencies_are_a_contradiction() {
        let a = vec![job(4100, "Ledger Close", &[3200], "export_A.json")];
        let b = vec![job(4100, "Ledger Close", &[2001], "export_B.yaml")];

        let err = reconcile(&a, &b).unwrap_err();
        assert!(err.to_string().contains("job 4100"), "{err}");

        let conflicts = err.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].job_id, 4100);
        assert_eq!(conflicts[0].source_a, "export_A.json");
        assert_eq!(conflicts[0].source_b, "export_B.yaml");
        assert_eq!(conflicts[0].description, "Dependencies differ: {3200} vs {2001}");
    }

    #[test]
    fn all_conflicts_are_collected() {
        let a = vec![
            job(1, "one", &[], "a"),
            job(2, "two", &[1], "a"),
            job(3, "three", &[], "a"),
        ];
        let b = vec![
            job(1, "uno", &[], "b"),
            job(2, "dos", &[3], "b"),
            job(3, "three", &[], "b"),
        ];

        let conflicts = conflicts_of(reconcile(&a, &b));
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].job_id, 1);
        assert_eq!(conflicts[0].description, "Job name differs: 'one' vs 'uno'");
        assert_eq!(conflicts[1].job_id, 2);
        assert_eq!(
            conflicts[1].description,
            "Job name differs: 'two' vs 'dos'; Dependencies differ: {1} vs {3}"
        );
    }

    #[test]
    fn missing_origin_falls_back_to_role_labels() {
        let a = vec![JobRecord::new(1, "a")];
        let b = vec![JobRecord::new(1, "b")];

        let conflicts = conflicts_of(reconcile(&a, &b));
        assert_eq!(conflicts[0].source_a, "primary");
        assert_eq!(conflicts[0].source_b, "secondary");
    }

    #[test]
    fn priority_decides_which_record_survives() {
        let a = vec![job(1, "a", &[], "a.json").with_notes("from A")];
        let b = vec![job(1, "a", &[], "b.yaml").with_notes("from B")];

        let ab = reconcile(&a, &b).unwrap();
        let ba = reconcile(&b, &a).unwrap();

        assert_eq!(ab[0].notes.as_deref(), Some("from A"));
        assert_eq!(ab[0].origin.as_deref(), Some("a.json"));
        assert_eq!(ba[0].notes.as_deref(), Some("from B"));
        assert_ne!(ab, ba);
    }

    #[test]
    fn contradiction_reports_depend_on_direction() {
        let a = vec![job(1, "a", &[], "a.json")];
        let b = vec![job(1, "b", &[], "b.yaml")];

        let ab = conflicts_of(reconcile(&a, &b));
        let ba = conflicts_of(reconcile(&b, &a));

        assert_eq!(ab[0].source_a, "a.json");
        assert_eq!(ba[0].source_a, "b.yaml");
        assert_eq!(ab[0].description, "Job name differs: 'a' vs 'b'");
        assert_eq!(ba[0].description, "Job name differs: 'b' vs 'a'");
    }

    #[test]
    fn repeated_calls_are_idempotent() {
        let a = vec![job(1, "a", &[2], "a"), job(2, "b", &[], "a")];
        let b = vec![job(3, "c", &[1], "b")];
        assert_eq!(reconcile(&a, &b).unwrap(), reconcile(&a, &b).unwrap());
    }
}

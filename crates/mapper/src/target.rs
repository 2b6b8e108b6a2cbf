//! Cycle-gated mapping from source [`JobRecord`]s to [`TargetJob`]s.

use std::collections::HashSet;

use tracing::{debug, info};

use jobmig_core::{JobId, JobRecord, Result, TargetJob, TriggerMode};
use jobmig_graph::assert_acyclic;

/// Knobs for the target mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOptions {
    /// Trigger mode stamped on every produced job.
    pub trigger_mode: TriggerMode,
}

/// Map `jobs` into the target shape with default options.
///
/// See [`to_target_with`].
pub fn to_target(jobs: &[JobRecord]) -> Result<Vec<TargetJob>> {
    to_target_with(jobs, &TargetOptions::default())
}

/// Map `jobs` into the target shape.
///
/// Fails with [`CycleDetected`](jobmig_core::MigrationError::CycleDetected)
/// carrying the first cycle found, and produces nothing in that case.
/// Otherwise emits exactly one target job per input job, in input order.
/// Dependency ids that do not name a job in the input are dropped.
pub fn to_target_with(jobs: &[JobRecord], options: &TargetOptions) -> Result<Vec<TargetJob>> {
    assert_acyclic(jobs)?;

    let known: HashSet<JobId> = jobs.iter().map(|j| j.id).collect();
    let mut dropped = 0usize;

    let targets: Vec<TargetJob> = jobs
        .iter()
        .map(|job| {
            let mut dependency_ids = Vec::with_capacity(job.dependencies.len());
            for dep in job.dependency_ids() {
                if known.contains(&dep) {
                    dependency_ids.push(dep);
                } else {
                    debug!(job_id = job.id, missing = dep, "dropping dangling dependency");
                    dropped += 1;
                }
            }
            TargetJob {
                id: job.id,
                name: job.name.clone(),
                dependency_ids,
                notes: job.notes.clone(),
                trigger_mode: options.trigger_mode,
            }
        })
        .collect();

    info!(jobs = targets.len(), dangling_dropped = dropped, "target jobs produced");
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use jobmig_core::{DependencyRef, MigrationError};
    use jobmig_graph::detect_cycles;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn job(id: JobId, deps: &[JobId]) -> JobRecord {
        deps.iter()
            .fold(JobRecord::new(id, format!("job-{id}")), |j, &d| j.depends_on(d))
    }

    #[test]
    fn empty_input_maps_to_empty_output() {
        assert!(to_target(&[]).unwrap().is_empty());
    }

    #[test]
    fn fields_are_carried_over_in_order() {
        let jobs = vec![
            job(3, &[1]).with_notes("nightly"),
            job(1, &[]),
            job(2, &[1, 3]),
        ];

        let targets = to_target(&jobs).unwrap();

        assert_eq!(targets.len(), jobs.len());
        let ids: Vec<JobId> = targets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(targets[0].name, "job-3");
        assert_eq!(targets[0].notes.as_deref(), Some("nightly"));
        assert_eq!(targets[2].dependency_ids, vec![1, 3]);
        assert!(targets.iter().all(|t| t.trigger_mode == TriggerMode::Manual));
    }

    #[test]
    fn dangling_dependencies_are_omitted() {
        let mut jobs = vec![job(1, &[]), job(2, &[1, 99])];
        jobs[1].dependencies.push(DependencyRef {
            target_id: None,
            status: Some("Success".into()),
        });

        let targets = to_target(&jobs).unwrap();

        assert_eq!(targets[1].dependency_ids, vec![1]);
    }

    #[test]
    fn cyclic_input_fails_with_the_cycle() {
        let jobs = vec![
            job(2001, &[4100]),
            job(3100, &[2001]),
            job(3200, &[3100]),
            job(4100, &[3200]),
        ];

        match to_target(&jobs) {
            Err(MigrationError::CycleDetected(path)) => {
                assert_eq!(path, vec![2001, 3100, 3200, 4100, 2001]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = to_target(&[job(1, &[]), job(7, &[7])]).unwrap_err();
        assert_eq!(err.cycle(), Some(&[7, 7][..]));
    }

    #[test]
    fn options_set_the_trigger_mode() {
        let options = TargetOptions {
            trigger_mode: TriggerMode::Manual,
        };
        let targets = to_target_with(&[job(1, &[])], &options).unwrap();
        assert_eq!(targets[0].trigger_mode, TriggerMode::Manual);
    }

    #[test]
    fn succeeds_exactly_when_no_cycles_exist() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let n: JobId = rng.gen_range(1..=8);
            let jobs: Vec<JobRecord> = (1..=n)
                .map(|id| {
                    let fan_in = rng.gen_range(0..3);
                    // n + 1 is never a job, so some references dangle.
                    let deps: Vec<JobId> = (0..fan_in).map(|_| rng.gen_range(1..=n + 1)).collect();
                    job(id, &deps)
                })
                .collect();

            let cycles = detect_cycles(&jobs);
            match to_target(&jobs) {
                Ok(targets) => {
                    assert!(cycles.is_empty());
                    assert_eq!(targets.len(), jobs.len());
                }
                Err(MigrationError::CycleDetected(first)) => {
                    assert_eq!(Some(&first), cycles.first());
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}

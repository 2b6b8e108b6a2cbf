use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use jobmig_core::{JobId, JobRecord, MigrationError, Result};

use super::{into_records, read_source, RawDependency, RawJob, RecordDecoder};

/// Decodes a `<ProcessChain>` export of `<Job id name dependsOn/>` elements.
///
/// The format carries at most one dependency per job and no notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecoder;

#[derive(Debug, Deserialize)]
struct ProcessChain {
    #[serde(rename = "Job", default)]
    jobs: Vec<XmlJob>,
}

#[derive(Debug, Deserialize)]
struct XmlJob {
    #[serde(rename = "@id")]
    id: Option<JobId>,
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@dependsOn")]
    depends_on: Option<JobId>,
}

impl From<XmlJob> for RawJob {
    fn from(job: XmlJob) -> Self {
        RawJob {
            job_id: job.id,
            job_name: job.name,
            dependencies: job.depends_on.map(|target| {
                vec![RawDependency {
                    job_id: Some(target),
                    status: None,
                }]
            }),
            notes: None,
        }
    }
}

impl XmlDecoder {
    pub fn decode_str(&self, text: &str, origin: &Path) -> Result<Vec<JobRecord>> {
        let chain: ProcessChain = quick_xml::de::from_str(text)
            .map_err(|e| MigrationError::decode(origin, format!("malformed XML: {e}")))?;
        let raw = chain.jobs.into_iter().map(|job| Some(RawJob::from(job))).collect();
        into_records(raw, &origin.display().to_string())
    }
}

impl RecordDecoder for XmlDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>> {
        let text = read_source(path)?;
        let jobs = self.decode_str(&text, path)?;
        debug!(path = %path.display(), jobs = jobs.len(), "decoded XML export");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ProcessChain>
    <Job id="2001" name="Backup_Production_Databases_Oracle"/>
    <Job id="3100" name="Archive" dependsOn="2001"/>
    <Job id="4100" name="Ledger Close" dependsOn="9999"></Job>
</ProcessChain>
"#;

    #[test]
    fn decodes_jobs_and_single_dependency() {
        let jobs = XmlDecoder.decode_str(EXPORT, Path::new("export_B.xml")).unwrap();

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].id, 2001);
        assert_eq!(jobs[0].name, "Backup_Production_Databases_Oracle");
        assert!(jobs[0].dependencies.is_empty());
        assert_eq!(jobs[1].dependency_ids().collect::<Vec<_>>(), vec![2001]);
        assert_eq!(jobs[1].dependencies[0].status, None);
        // Dangling references survive decoding.
        assert_eq!(jobs[2].dependency_ids().collect::<Vec<_>>(), vec![9999]);
        assert!(jobs.iter().all(|j| j.notes.is_none()));
        assert_eq!(jobs[2].origin.as_deref(), Some("export_B.xml"));
    }

    #[test]
    fn empty_chain_decodes_to_no_jobs() {
        assert!(XmlDecoder.decode_str("<ProcessChain/>", Path::new("e.xml")).unwrap().is_empty());
        assert!(XmlDecoder
            .decode_str("<ProcessChain></ProcessChain>", Path::new("e.xml"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn job_without_id_fails_the_file() {
        let err = XmlDecoder
            .decode_str(r#"<ProcessChain><Job name="x"/></ProcessChain>"#, Path::new("b.xml"))
            .unwrap_err();
        assert!(matches!(err, MigrationError::Validation(_)), "{err}");
    }

    #[test]
    fn non_numeric_id_is_a_decode_error() {
        let err = XmlDecoder
            .decode_str(r#"<ProcessChain><Job id="abc" name="x"/></ProcessChain>"#, Path::new("b.xml"))
            .unwrap_err();
        assert!(err.to_string().contains("malformed XML"), "{err}");
    }
}

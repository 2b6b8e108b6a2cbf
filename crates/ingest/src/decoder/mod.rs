//! Source-file decoders that turn job export files into [`JobRecord`]s.

mod json;
mod xml;
mod yaml;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use jobmig_core::{DependencyRef, JobId, JobRecord, MigrationError, Result};

pub use json::JsonDecoder;
pub use xml::XmlDecoder;
pub use yaml::YamlDecoder;

/// Decodes one source file and checks the decoded records' structure.
///
/// Implementations must be shareable across the ingestion worker pool.
pub trait RecordDecoder: Send + Sync {
    /// Read and decode every job record in `path`.
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>>;

    /// Structural check run on a successful decode.
    fn validate_structure(&self, jobs: &[JobRecord]) -> Result<()> {
        crate::validate::validate_structure(jobs)
    }
}

impl<F> RecordDecoder for F
where
    F: Fn(&Path) -> Result<Vec<JobRecord>> + Send + Sync,
{
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>> {
        self(path)
    }
}

/// Source format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
    Xml,
}

impl SourceFormat {
    /// `.yml`/`.yaml` decode as YAML, `.xml` as XML, everything else as JSON.
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "yml" | "yaml" => SourceFormat::Yaml,
            "xml" => SourceFormat::Xml,
            _ => SourceFormat::Json,
        }
    }
}

/// Picks the JSON, YAML or XML decoder per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionDecoder {
    json: JsonDecoder,
    yaml: YamlDecoder,
    xml: XmlDecoder,
}

impl ExtensionDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordDecoder for ExtensionDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>> {
        match SourceFormat::detect(path) {
            SourceFormat::Json => self.json.decode(path),
            SourceFormat::Yaml => self.yaml.decode(path),
            SourceFormat::Xml => self.xml.decode(path),
        }
    }
}

// ── Wire shape shared by the exports ────────────────────────────────

/// `{ "job_id", "job_name", "dependencies": [{ "job_id", "status" }], "notes" }`
#[derive(Debug, Deserialize)]
struct RawJob {
    job_id: Option<JobId>,
    job_name: Option<String>,
    dependencies: Option<Vec<RawDependency>>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    job_id: Option<JobId>,
    status: Option<String>,
}

/// A missing file is a decode failure of that path; other IO failures pass through.
fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MigrationError::decode(path, "file not found"),
        _ => MigrationError::Io(e),
    })
}

/// Convert wire records into domain records tagged with `origin`.
///
/// `null` array entries are skipped. Records without a `job_id` cannot be
/// identified and fail the whole file.
fn into_records(raw: Vec<Option<RawJob>>, origin: &str) -> Result<Vec<JobRecord>> {
    let mut jobs = Vec::with_capacity(raw.len());
    let mut defects = Vec::new();

    for (index, entry) in raw.into_iter().enumerate() {
        let Some(job) = entry else {
            continue;
        };
        let Some(id) = job.job_id else {
            defects.push(format!("record #{} missing required field: job_id", index + 1));
            continue;
        };

        let dependencies = job
            .dependencies
            .unwrap_or_default()
            .into_iter()
            .map(|d| DependencyRef {
                target_id: d.job_id,
                status: d.status,
            })
            .collect();

        jobs.push(JobRecord {
            id,
            name: job.job_name.unwrap_or_default(),
            dependencies,
            notes: job.notes,
            origin: Some(origin.to_string()),
        });
    }

    if defects.is_empty() {
        Ok(jobs)
    } else {
        Err(MigrationError::Validation(defects))
    }
}

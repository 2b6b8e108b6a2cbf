use std::path::Path;

use tracing::debug;

use jobmig_core::{JobRecord, MigrationError, Result};

use super::{into_records, read_source, RawJob, RecordDecoder};

/// Decodes a YAML sequence of job mappings (same fields as the JSON export).
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl YamlDecoder {
    pub fn decode_str(&self, text: &str, origin: &Path) -> Result<Vec<JobRecord>> {
        let raw: Vec<Option<RawJob>> = serde_yaml::from_str(text)
            .map_err(|e| MigrationError::decode(origin, format!("malformed YAML: {e}")))?;
        into_records(raw, &origin.display().to_string())
    }
}

impl RecordDecoder for YamlDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>> {
        let text = read_source(path)?;
        let jobs = self.decode_str(&text, path)?;
        debug!(path = %path.display(), jobs = jobs.len(), "decoded YAML export");
        Ok(jobs)
    }
}

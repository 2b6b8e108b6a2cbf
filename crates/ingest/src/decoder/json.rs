use std::path::Path;

use tracing::debug;

use jobmig_core::{JobRecord, MigrationError, Result};

use super::{into_records, read_source, RawJob, RecordDecoder};

/// Decodes a JSON array of job objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Decode JSON text; `origin` tags every record.
    pub fn decode_str(&self, text: &str, origin: &Path) -> Result<Vec<JobRecord>> {
        let raw: Vec<Option<RawJob>> = serde_json::from_str(text)
            .map_err(|e| MigrationError::decode(origin, format!("malformed JSON: {e}")))?;
        into_records(raw, &origin.display().to_string())
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<JobRecord>> {
        let text = read_source(path)?;
        let jobs = self.decode_str(&text, path)?;
        debug!(path = %path.display(), jobs = jobs.len(), "decoded JSON export");
        Ok(jobs)
    }
}

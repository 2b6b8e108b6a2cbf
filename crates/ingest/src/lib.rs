//! Concurrent ingestion of job export files.
//!
//! - [`decoder`]: JSON, YAML and XML export decoders behind the [`RecordDecoder`] trait
//! - [`validate`]: structural checks on a decoded file
//! - [`coordinator`]: bounded worker pool with input-ordered aggregation

pub mod coordinator;
pub mod decoder;
pub mod validate;

pub use coordinator::{FileError, IngestCoordinator, ParseOutcome};
pub use decoder::{
    ExtensionDecoder, JsonDecoder, RecordDecoder, SourceFormat, XmlDecoder, YamlDecoder,
};
pub use validate::validate_structure;

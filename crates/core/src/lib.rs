pub mod config;
pub mod error;
pub mod model;

pub use config::{Config, IngestConfig};
pub use error::*;
pub use model::*;

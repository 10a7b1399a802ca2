//! Data ingestion
//!
//! Readers and writers for the operator's per-session CSV export, the
//! per-device status-change stream (one JSON object per line) and the
//! derived hourly series.

use std::path::PathBuf;
use thiserror::Error;

pub mod sessions;
pub mod status_log;

pub use sessions::*;
pub use status_log::*;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}' in CSV header")]
    MissingColumn(&'static str),
}

//! Error types for SchemaLens.
//!
//! Most per-file and per-entry failures are logged and skipped rather than
//! propagated: a scan always completes with a best-effort index. These types
//! carry the context that gets logged and recorded in the scan report.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LensError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Malformed executables entry: {0}")]
    BadExecutableEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LensError>;

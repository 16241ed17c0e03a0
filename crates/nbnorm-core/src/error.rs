//! Error types for nbnorm
//!
//! All fallible operations return `Result<T, Error>`.
//! Every variant that touches the filesystem carries the offending path.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// nbnorm error types
#[derive(Debug, Error)]
pub enum Error {
    /// File could not be read as UTF-8 text
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File contents are not valid JSON
    #[error("failed to parse JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Valid JSON, but not shaped like a notebook
    #[error("invalid notebook: {0}")]
    InvalidNotebook(String),

    /// Normalized document could not be serialized
    #[error("failed to serialize notebook: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Backup copy could not be created
    #[error("failed to back up to {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Normalized document could not be written back
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path argument is not a usable glob pattern
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Result type alias for nbnorm operations
pub type Result<T> = std::result::Result<T, Error>;

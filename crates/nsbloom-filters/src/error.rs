//! Error types for the filter library

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while creating, opening or persisting a filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Filter file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Unsupported filter file version {found} in {path} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FilterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the backing file is absent (as opposed to unreadable or damaged)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

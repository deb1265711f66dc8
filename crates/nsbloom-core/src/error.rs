//! Error types for the membership server core

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use nsbloom_filters::FilterError;
use thiserror::Error;

pub use crate::adapters::lock::LockError;

/// A namespace parameter that cannot name a filter file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("namespace is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("namespace contains invalid character {0:?}")]
    InvalidCharacter(char),

    #[error("namespace {0:?} is reserved")]
    Reserved(String),
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bloom directory is not configured")]
    MissingBloomDir,

    #[error("bloom directory {0} does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid filter configuration: {0}")]
    Filter(#[from] FilterError),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Namespace registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to create filter for namespace {namespace}: {source}")]
    Create {
        namespace: String,
        #[source]
        source: FilterError,
    },
}

/// Startup errors raised while loading the bloom directory
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to scan bloom directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open or create default filter {path}: {source}")]
    DefaultFilter {
        path: PathBuf,
        #[source]
        source: FilterError,
    },
}

/// Server lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

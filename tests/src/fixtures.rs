//! Test fixtures
//!
//! [`ExactSetFilter`] plugs into the server through the same
//! [`MembershipFilter`] port as the bloom filter but never reports a false
//! positive, so tests can assert exact membership answers.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use nsbloom_core::ServerConfig;
use nsbloom_filters::{FilterConfig, FilterError, MembershipFilter};
use tempfile::TempDir;

/// A hash set persisted with bincode
#[derive(Debug)]
pub struct ExactSetFilter {
    path: PathBuf,
    keys: HashSet<Vec<u8>>,
    dirty: bool,
}

impl ExactSetFilter {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn write(&self) -> Result<(), FilterError> {
        let bytes =
            bincode::serialize(&self.keys).map_err(|e| FilterError::Serialization(e.to_string()))?;
        fs::write(&self.path, bytes).map_err(|source| FilterError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl MembershipFilter for ExactSetFilter {
    fn create(path: &Path, _config: &FilterConfig) -> Result<Self, FilterError> {
        let filter = Self {
            path: path.to_path_buf(),
            keys: HashSet::new(),
            dirty: false,
        };
        filter.write()?;
        Ok(filter)
    }

    fn open(path: &Path, _config: &FilterConfig) -> Result<Self, FilterError> {
        let bytes = fs::read(path).map_err(|source| FilterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let keys = bincode::deserialize(&bytes).map_err(|e| FilterError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            keys,
            dirty: false,
        })
    }

    fn add(&mut self, key: &[u8], _id: u64) {
        self.dirty |= self.keys.insert(key.to_vec());
    }

    fn check(&self, key: &[u8]) -> bool {
        self.keys.contains(key)
    }

    fn flush(&mut self) -> Result<(), FilterError> {
        if self.dirty {
            self.write()?;
            self.dirty = false;
        }
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A fresh bloom directory and a config serving it with small filters
pub fn bloom_dir() -> (TempDir, ServerConfig) {
    let dir = TempDir::new().expect("create temp dir");
    let mut config = ServerConfig::for_dir(dir.path());
    config.filter = config.filter.with_capacity(1_000);
    config.flush_interval_secs = 0;
    (dir, config)
}

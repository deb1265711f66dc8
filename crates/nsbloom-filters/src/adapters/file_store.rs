//! File-backed scaling bloom filter
//!
//! On-disk layout:
//!
//! ```text
//! +--------+-------------+------------------------------------+
//! | "NSBF" | version u32 | bincode(ScalingBloomFilter)        |
//! | 4 B    | 4 B, LE     | rest of file                       |
//! +--------+-------------+------------------------------------+
//! ```
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the target, so a crash never leaves a half-written filter behind.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{FilterConfig, ScalingBloomFilter};
use crate::error::FilterError;
use crate::ports::MembershipFilter;

/// File magic
pub const FILE_MAGIC: [u8; 4] = *b"NSBF";

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// A [`ScalingBloomFilter`] persisted at a fixed path
#[derive(Debug)]
pub struct PersistentFilter {
    path: PathBuf,
    filter: ScalingBloomFilter,
    dirty: bool,
}

impl PersistentFilter {
    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filter(&self) -> &ScalingBloomFilter {
        &self.filter
    }

    /// Flush and release the filter
    pub fn close(mut self) -> Result<(), FilterError> {
        self.flush()
    }

    fn encode(&self) -> Result<Vec<u8>, FilterError> {
        let body = bincode::serialize(&self.filter)
            .map_err(|e| FilterError::Serialization(e.to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&FILE_MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<ScalingBloomFilter, FilterError> {
        let corrupt = |reason: String| FilterError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        if bytes.len() < HEADER_LEN {
            return Err(corrupt(format!("file is {} bytes, shorter than header", bytes.len())));
        }
        if bytes[..4] != FILE_MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(FilterError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let filter: ScalingBloomFilter = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| corrupt(e.to_string()))?;
        if !filter.is_well_formed() {
            return Err(corrupt("inconsistent filter state".to_string()));
        }
        Ok(filter)
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FilterError> {
        let tmp = temp_path(path);

        let result = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            return Err(FilterError::io(path, source));
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl MembershipFilter for PersistentFilter {
    fn create(path: &Path, config: &FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;

        let mut filter = Self {
            path: path.to_path_buf(),
            filter: ScalingBloomFilter::new(config.clone()),
            dirty: true,
        };
        filter.flush()?;
        debug!(path = %path.display(), "Created bloom filter");
        Ok(filter)
    }

    fn open(path: &Path, _config: &FilterConfig) -> Result<Self, FilterError> {
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .map_err(|e| FilterError::io(path, e))?;

        let filter = Self::decode(path, &bytes)?;
        debug!(
            path = %path.display(),
            elements = filter.len(),
            stages = filter.stages().len(),
            "Opened bloom filter"
        );

        Ok(Self {
            path: path.to_path_buf(),
            filter,
            dirty: false,
        })
    }

    fn add(&mut self, key: &[u8], id: u64) {
        self.filter.add(key, id);
        self.dirty = true;
    }

    fn check(&self, key: &[u8]) -> bool {
        self.filter.check(key)
    }

    fn flush(&mut self) -> Result<(), FilterError> {
        if !self.dirty {
            return Ok(());
        }
        let bytes = self.encode()?;
        Self::write_atomic(&self.path, &bytes)?;
        self.dirty = false;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PersistentFilter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "Failed to flush bloom filter on drop");
        }
    }
}

//! Namespace identifiers and their backing file paths
//!
//! A namespace becomes a file name, so non-default namespaces are restricted
//! to `[A-Za-z0-9._-]` and must not be `.` or `..`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::NamespaceError;

/// File stem of the default namespace
pub const DEFAULT_FILE_STEM: &str = "global";

/// Extension of every filter file
pub const FILTER_EXTENSION: &str = "bf";

/// A validated namespace; the empty namespace is the default one
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// The default namespace
    pub fn default_namespace() -> Self {
        Self::default()
    }

    /// Validate a raw namespace parameter.
    ///
    /// `""` and `"global"` both name the default namespace.
    pub fn parse(raw: &str, max_bytes: usize) -> Result<Self, NamespaceError> {
        if raw.is_empty() || raw == DEFAULT_FILE_STEM {
            return Ok(Self::default());
        }
        if raw.len() > max_bytes {
            return Err(NamespaceError::TooLong {
                len: raw.len(),
                max: max_bytes,
            });
        }
        if raw == "." || raw == ".." {
            return Err(NamespaceError::Reserved(raw.to_string()));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(NamespaceError::InvalidCharacter(c));
        }
        Ok(Self(raw.to_string()))
    }

    /// Recover the namespace stored in a filter file name (`<ns>.bf`).
    ///
    /// Returns `None` for files that are not filter files.
    pub fn from_file_name(
        file_name: &str,
        max_bytes: usize,
    ) -> Option<Result<Self, NamespaceError>> {
        let stem = file_name.strip_suffix(FILTER_EXTENSION)?.strip_suffix('.')?;
        if stem.is_empty() {
            return Some(Err(NamespaceError::Reserved(file_name.to_string())));
        }
        Some(Self::parse(stem, max_bytes))
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn file_stem(&self) -> &str {
        if self.is_default() {
            DEFAULT_FILE_STEM
        } else {
            &self.0
        }
    }

    /// The one place a namespace is mapped to its backing file
    pub fn filter_path(&self, bloom_dir: &Path) -> PathBuf {
        bloom_dir.join(format!("{}.{}", self.file_stem(), FILTER_EXTENSION))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

//! Membership filter port (Driven Port)

use std::path::Path;

use crate::domain::FilterConfig;
use crate::error::FilterError;

/// A file-backed probabilistic set keyed by byte strings
///
/// INVARIANTS:
/// - After `add(key, _)` returns, `check(key)` MUST return true
/// - `flush()` makes every prior `add` durable at the backing path
pub trait MembershipFilter: Send + Sync + Sized {
    /// Create a new, empty filter persisted at `path`, replacing any file there
    fn create(path: &Path, config: &FilterConfig) -> Result<Self, FilterError>;

    /// Reopen a filter previously persisted at `path`
    ///
    /// `config` only applies when the stored state does not carry its own.
    fn open(path: &Path, config: &FilterConfig) -> Result<Self, FilterError>;

    /// Insert `key` with insertion id `id`
    fn add(&mut self, key: &[u8], id: u64);

    /// Whether `key` may have been inserted
    fn check(&self, key: &[u8]) -> bool;

    /// Persist pending changes
    fn flush(&mut self) -> Result<(), FilterError>;

    /// Whether there are changes not yet written by `flush`
    fn is_dirty(&self) -> bool {
        true
    }
}

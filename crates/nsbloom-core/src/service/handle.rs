//! A live filter bound to one namespace

use std::path::{Path, PathBuf};

use nsbloom_filters::{FilterError, MembershipFilter};
use parking_lot::Mutex;

use crate::domain::{InsertionIds, Namespace};

/// Outcome of an insert-if-absent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// Key was absent and is now recorded under this id
    Added(u64),
    /// Key (or a false positive for it) was already present
    Exists,
}

/// A namespace's filter and the path it is persisted at
///
/// Every filter operation goes through the inner mutex, so the
/// check-then-add of an insertion is atomic per namespace.
#[derive(Debug)]
pub struct FilterHandle<F> {
    namespace: Namespace,
    path: PathBuf,
    filter: Mutex<F>,
}

impl<F: MembershipFilter> FilterHandle<F> {
    pub fn new(namespace: Namespace, path: PathBuf, filter: F) -> Self {
        Self {
            namespace,
            path,
            filter: Mutex::new(filter),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn check(&self, key: &[u8]) -> bool {
        self.filter.lock().check(key)
    }

    /// Add `key` unless it is already present, taking an id only when added
    pub fn insert_if_absent(&self, key: &[u8], ids: &InsertionIds) -> Insertion {
        let mut filter = self.filter.lock();
        if filter.check(key) {
            return Insertion::Exists;
        }
        let id = ids.next_id();
        filter.add(key, id);
        Insertion::Added(id)
    }

    /// Run `f` with the filter locked, for bulk loads
    pub fn with_filter<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        f(&mut self.filter.lock())
    }

    pub fn is_dirty(&self) -> bool {
        self.filter.lock().is_dirty()
    }

    pub fn flush(&self) -> Result<(), FilterError> {
        self.filter.lock().flush()
    }
}

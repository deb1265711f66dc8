//! Namespace registry: the single owner of namespace → filter handles
//!
//! ## Concurrency
//!
//! The map holds one creation slot per namespace. A miss inserts an empty
//! slot under the write lock and releases it; the filter file is then created
//! while holding only that slot's mutex. Concurrent requesters for the same
//! new namespace queue on the slot and observe the winner's handle, so the
//! file is created exactly once, while lookups of other namespaces never
//! wait on filesystem work.
//!
//! The default namespace is held outside the map and never created lazily.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nsbloom_filters::{FilterConfig, MembershipFilter};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::handle::FilterHandle;
use crate::domain::{Metrics, Namespace};
use crate::error::RegistryError;

/// Empty until the namespace's filter has been created
type Slot<F> = Arc<Mutex<Option<Arc<FilterHandle<F>>>>>;

/// Maps namespaces to their live filters
#[derive(Debug)]
pub struct NamespaceRegistry<F> {
    bloom_dir: PathBuf,
    filter_config: FilterConfig,
    default: Arc<FilterHandle<F>>,
    entries: RwLock<HashMap<Namespace, Slot<F>>>,
    metrics: Arc<Metrics>,
}

impl<F: MembershipFilter> NamespaceRegistry<F> {
    /// Create a registry around an already opened default filter
    pub fn new(
        bloom_dir: impl Into<PathBuf>,
        filter_config: FilterConfig,
        default: FilterHandle<F>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            bloom_dir: bloom_dir.into(),
            filter_config,
            default: Arc::new(default),
            entries: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn bloom_dir(&self) -> &Path {
        &self.bloom_dir
    }

    pub fn default_handle(&self) -> &Arc<FilterHandle<F>> {
        &self.default
    }

    /// Register a filter opened at startup. Returns false if the namespace
    /// was already present (the new filter is dropped).
    pub fn insert_loaded(&self, handle: FilterHandle<F>) -> bool {
        if handle.namespace().is_default() {
            return false;
        }
        let mut entries = self.entries.write();
        if entries.contains_key(handle.namespace()) {
            return false;
        }
        let namespace = handle.namespace().clone();
        entries.insert(namespace, Arc::new(Mutex::new(Some(Arc::new(handle)))));
        true
    }

    /// Get the handle for `namespace`, creating its filter file on first use
    pub fn resolve(&self, namespace: &Namespace) -> Result<Arc<FilterHandle<F>>, RegistryError> {
        if namespace.is_default() {
            return Ok(Arc::clone(&self.default));
        }

        loop {
            let slot = self.slot(namespace);
            let mut filled = slot.lock();
            // Another request may have created it while we queued on the slot
            if let Some(handle) = filled.as_ref() {
                return Ok(Arc::clone(handle));
            }
            // A failed creation discarded this slot; start over with the live one
            if !self.is_current(namespace, &slot) {
                continue;
            }

            let path = namespace.filter_path(&self.bloom_dir);
            let filter = match F::create(&path, &self.filter_config) {
                Ok(filter) => filter,
                Err(source) => {
                    error!(namespace = %namespace, path = %path.display(), error = %source, "Failed to create namespace filter");
                    drop(filled);
                    self.discard_empty(namespace, &slot);
                    return Err(RegistryError::Create {
                        namespace: namespace.to_string(),
                        source,
                    });
                }
            };

            let handle = Arc::new(FilterHandle::new(namespace.clone(), path, filter));
            *filled = Some(Arc::clone(&handle));
            self.metrics.record_namespace_created();
            info!(namespace = %namespace, "Created namespace");

            return Ok(handle);
        }
    }

    /// The creation slot for `namespace`, inserting an empty one on a miss
    fn slot(&self, namespace: &Namespace) -> Slot<F> {
        if let Some(slot) = self.entries.read().get(namespace) {
            return Arc::clone(slot);
        }
        Arc::clone(self.entries.write().entry(namespace.clone()).or_default())
    }

    fn is_current(&self, namespace: &Namespace, slot: &Slot<F>) -> bool {
        self.entries
            .read()
            .get(namespace)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drop `slot` after a failed creation unless another requester has
    /// filled it or is retrying the creation
    fn discard_empty(&self, namespace: &Namespace, slot: &Slot<F>) {
        let mut entries = self.entries.write();
        let unfilled = entries.get(namespace).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && current.try_lock().is_some_and(|filled| filled.is_none())
        });
        if unfilled {
            entries.remove(namespace);
        }
    }

    /// Whether `namespace` currently has a live handle
    pub fn contains(&self, namespace: &Namespace) -> bool {
        if namespace.is_default() {
            return true;
        }
        let slot = self.entries.read().get(namespace).cloned();
        slot.is_some_and(|slot| slot.lock().is_some())
    }

    /// Number of live namespaces, the default one included
    pub fn len(&self) -> usize {
        self.handles().len()
    }

    /// Always false: the default namespace exists from construction
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All live namespaces, sorted (the default sorts first)
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut names: Vec<Namespace> = self
            .handles()
            .iter()
            .map(|handle| handle.namespace().clone())
            .collect();
        names.sort();
        names
    }

    /// Live handles, the default first. Slots are cloned out before locking
    /// so an in-flight creation never blocks the map.
    fn handles(&self) -> Vec<Arc<FilterHandle<F>>> {
        let slots: Vec<Slot<F>> = self.entries.read().values().cloned().collect();
        std::iter::once(Arc::clone(&self.default))
            .chain(slots.iter().filter_map(|slot| slot.lock().clone()))
            .collect()
    }

    /// Persist every dirty filter. Returns the number of failures, each of
    /// which is logged and counted.
    pub fn flush_all(&self) -> usize {
        let mut flushed = 0usize;
        let mut failures = 0usize;

        for handle in self.handles() {
            if !handle.is_dirty() {
                continue;
            }
            match handle.flush() {
                Ok(()) => flushed += 1,
                Err(e) => {
                    failures += 1;
                    self.metrics.record_flush_failure();
                    error!(namespace = %handle.namespace(), error = %e, "Failed to flush filter");
                }
            }
        }

        if flushed > 0 || failures > 0 {
            debug!(flushed, failures, "Flushed dirty filters");
        }
        failures
    }

    /// Final flush at shutdown
    pub fn close(&self) -> usize {
        let failures = self.flush_all();
        info!(namespaces = self.len(), failures, "Namespace registry closed");
        failures
    }
}

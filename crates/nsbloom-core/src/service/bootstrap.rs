//! Startup loading of the bloom directory
//!
//! Runs once, before the listener is bound:
//!
//! 1. Reopen every `<namespace>.bf` in the bloom directory, recreating any
//!    that fail to open
//! 2. Reopen or create `global.bf` (fatal if neither works)
//! 3. Insert the optional word list into the default namespace
//! 4. Insert generated keys when stress mode is enabled

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use nsbloom_filters::{FilterConfig, FilterError, MembershipFilter};
use tracing::{error, info, warn};

use super::handle::FilterHandle;
use super::registry::NamespaceRegistry;
use crate::domain::{InsertionIds, Metrics, Namespace, ServerConfig};
use crate::error::BootstrapError;

/// Outcome of loading a word list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WordListStats {
    /// Lines added to the default filter
    pub inserted: u64,
    /// Lines over the key limit, not added
    pub skipped: u64,
}

/// Loads the registry from a bloom directory
pub struct BootstrapLoader<'a> {
    config: &'a ServerConfig,
    metrics: Arc<Metrics>,
    ids: &'a InsertionIds,
}

impl<'a> BootstrapLoader<'a> {
    pub fn new(config: &'a ServerConfig, metrics: Arc<Metrics>, ids: &'a InsertionIds) -> Self {
        Self {
            config,
            metrics,
            ids,
        }
    }

    /// Build the registry. Only directory and default-filter failures are fatal.
    pub fn load<F: MembershipFilter>(&self) -> Result<NamespaceRegistry<F>, BootstrapError> {
        let started = Instant::now();
        let bloom_dir = self.bloom_dir()?;
        let filter_config = &self.config.filter;

        let loaded = self.load_namespaces::<F>(&bloom_dir)?;
        let default = open_default::<F>(&bloom_dir, filter_config)?;

        let registry = NamespaceRegistry::new(
            bloom_dir.clone(),
            filter_config.clone(),
            default,
            Arc::clone(&self.metrics),
        );
        for handle in loaded {
            registry.insert_loaded(handle);
        }
        self.metrics.set_namespaces(registry.len() as u64);

        if let Some(path) = &self.config.bootstrap {
            match load_word_list(registry.default_handle(), path, self.config.limits.max_key_bytes) {
                Ok(stats) => info!(
                    path = %path.display(),
                    inserted = stats.inserted,
                    skipped = stats.skipped,
                    "Loaded bootstrap word list"
                ),
                Err(e) => error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read bootstrap word list, continuing without it"
                ),
            }
        }

        if self.config.stress.enabled {
            run_stress(registry.default_handle(), self.ids, self.config.stress.keys);
        }

        if let Err(e) = registry.default_handle().flush() {
            warn!(error = %e, "Failed to flush default filter after bootstrap");
        }

        info!(
            bloom_dir = %bloom_dir.display(),
            namespaces = registry.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bootstrap complete"
        );
        Ok(registry)
    }

    fn bloom_dir(&self) -> Result<PathBuf, BootstrapError> {
        Ok(self.config.bloom_dir()?.to_path_buf())
    }

    fn load_namespaces<F: MembershipFilter>(
        &self,
        bloom_dir: &Path,
    ) -> Result<Vec<FilterHandle<F>>, BootstrapError> {
        let read_dir_err = |source| BootstrapError::ReadDir {
            path: bloom_dir.to_path_buf(),
            source,
        };

        let mut handles = Vec::new();
        for entry in fs::read_dir(bloom_dir).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(file = ?entry.file_name(), "Skipping file with non UTF-8 name");
                continue;
            };

            let namespace = match Namespace::from_file_name(&name, self.config.limits.max_namespace_bytes) {
                None => continue,
                Some(Ok(ns)) if ns.is_default() => continue,
                Some(Ok(ns)) => ns,
                Some(Err(e)) => {
                    warn!(file = %name, error = %e, "Skipping filter file with invalid namespace");
                    continue;
                }
            };

            let path = entry.path();
            if let Some(filter) = open_or_recreate::<F>(&namespace, &path, &self.config.filter) {
                handles.push(FilterHandle::new(namespace, path, filter));
            }
        }

        info!(count = handles.len(), "Loaded namespaces from bloom directory");
        Ok(handles)
    }
}

fn open_or_recreate<F: MembershipFilter>(
    namespace: &Namespace,
    path: &Path,
    config: &FilterConfig,
) -> Option<F> {
    match F::open(path, config) {
        Ok(filter) => Some(filter),
        Err(open_err) => {
            warn!(
                namespace = %namespace,
                path = %path.display(),
                error = %open_err,
                "Failed to reopen filter, recreating it empty"
            );
            match F::create(path, config) {
                Ok(filter) => Some(filter),
                Err(e) => {
                    error!(namespace = %namespace, path = %path.display(), error = %e, "Failed to recreate filter, skipping namespace");
                    None
                }
            }
        }
    }
}

fn open_default<F: MembershipFilter>(
    bloom_dir: &Path,
    config: &FilterConfig,
) -> Result<FilterHandle<F>, BootstrapError> {
    let namespace = Namespace::default();
    let path = namespace.filter_path(bloom_dir);

    let filter = match F::open(&path, config) {
        Ok(filter) => filter,
        Err(e) => {
            if e.is_not_found() {
                info!(path = %path.display(), "Creating default filter");
            } else {
                warn!(path = %path.display(), error = %e, "Failed to reopen default filter, recreating it empty");
            }
            F::create(&path, config).map_err(|source: FilterError| BootstrapError::DefaultFilter {
                path: path.clone(),
                source,
            })?
        }
    };

    Ok(FilterHandle::new(namespace, path, filter))
}

/// Insert every line of `path` into `handle`, tagged with its 0-based line index.
///
/// Trailing `\r`/`\n` are trimmed and empty lines are ignored.
pub fn load_word_list<F: MembershipFilter>(
    handle: &FilterHandle<F>,
    path: &Path,
    max_key_bytes: usize,
) -> std::io::Result<WordListStats> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut stats = WordListStats::default();
    let mut line = Vec::new();
    let mut index = 0u64;

    handle.with_filter(|filter| -> std::io::Result<WordListStats> {
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }

            if line.len() > max_key_bytes {
                stats.skipped += 1;
            } else if !line.is_empty() {
                filter.add(&line, index);
                stats.inserted += 1;
            }
            index += 1;
        }
        Ok(stats)
    })
}

/// Insert `keys` generated keys `word<i>` into `handle`, each with a fresh id
pub fn run_stress<F: MembershipFilter>(handle: &FilterHandle<F>, ids: &InsertionIds, keys: u64) {
    info!(keys, "Stress mode: inserting generated keys");
    let started = Instant::now();

    handle.with_filter(|filter| {
        for i in 0..keys {
            filter.add(format!("word{i}").as_bytes(), ids.next_id());
        }
    });

    info!(
        keys,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stress mode complete"
    );
}

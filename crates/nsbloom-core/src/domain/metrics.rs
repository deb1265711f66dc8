//! Process-wide usage counters
//!
//! Counters are monotonic for the life of the process and never persisted.
//!
//! ## Usage
//!
//! ```
//! use nsbloom_core::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_query(true);
//! metrics.record_addition();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.hits, 1);
//! assert_eq!(snapshot.additions, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Metrics collector for membership requests
#[derive(Debug, Default)]
pub struct Metrics {
    /// Membership queries answered
    pub queries: AtomicU64,
    /// Queries answered with `1`
    pub query_hits: AtomicU64,
    /// Queries answered with `0`
    pub query_misses: AtomicU64,
    /// Keys added
    pub additions: AtomicU64,
    /// Live namespaces, the default one included
    pub namespaces: AtomicU64,
    /// Failed filter flushes (not part of the public snapshot)
    pub flush_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a membership query and its answer
    pub fn record_query(&self, hit: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.query_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.query_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_addition(&self) {
        self.additions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_namespace_created(&self) {
        self.namespaces.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the namespace count after bootstrap
    pub fn set_namespaces(&self, count: u64) {
        self.namespaces.store(count, Ordering::Relaxed);
    }

    pub fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Copy of the public counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            hits: self.query_hits.load(Ordering::Relaxed),
            misses: self.query_misses.load(Ordering::Relaxed),
            additions: self.additions.load(Ordering::Relaxed),
            namespaces: self.namespaces.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`Metrics`], in wire field order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub additions: u64,
    pub namespaces: u64,
}

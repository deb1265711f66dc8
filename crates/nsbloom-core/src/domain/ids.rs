//! Insertion id allocation

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide insertion id counter shared by every namespace
///
/// Ids start at 0 and are handed out exactly once.
#[derive(Debug, Default)]
pub struct InsertionIds {
    next: AtomicU64,
}

impl InsertionIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`next_id`](Self::next_id) will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

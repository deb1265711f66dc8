//! # nsbloom-filters
//!
//! Scaling bloom filters persisted to disk, the storage layer behind the
//! namespaced membership server.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure filter logic, no I/O
//!   - `BloomFilter`: Fixed-size probabilistic set (one stage)
//!   - `ScalingBloomFilter`: Series of stages that grows with its contents
//!   - `FilterConfig`: Capacity and error rate, with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `MembershipFilter`: What the server needs from a filter
//!
//! - **Adapters Layer** (`adapters/`): Filesystem connections
//!   - `PersistentFilter`: `ScalingBloomFilter` in a single atomic file
//!
//! ## Invariants
//!
//! - **No false negatives**: once `add(key)` returns, `check(key)` is true,
//!   including after a flush and reopen
//! - Compound false positive rate stays below
//!   `error_rate / (1 - tightening_ratio)`
//!
//! ## Usage Example
//!
//! ```no_run
//! use nsbloom_filters::{FilterConfig, MembershipFilter, PersistentFilter};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), nsbloom_filters::FilterError> {
//! let config = FilterConfig::default().with_capacity(10_000);
//! let mut filter = PersistentFilter::create(Path::new("/tmp/words.bf"), &config)?;
//!
//! filter.add(b"foo", 0);
//! assert!(filter.check(b"foo"));
//! filter.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::{PersistentFilter, FILE_MAGIC, FORMAT_VERSION};
pub use domain::{
    calculate_fpr, calculate_optimal_parameters, BloomFilter, BloomFilterParams, FilterConfig,
    FilterStage, ScalingBloomFilter,
};
pub use error::FilterError;
pub use ports::MembershipFilter;

//! Domain Layer - Server types with no I/O beyond config loading
//!
//! - `Namespace`: validated namespace names and their file paths
//! - `Metrics`: process-wide usage counters
//! - `InsertionIds`: shared insertion id counter
//! - `ServerConfig`: configuration with validation

pub mod config;
pub mod ids;
pub mod metrics;
pub mod namespace;

pub use config::{HttpConfig, LimitsConfig, ServerConfig, StressConfig};
pub use ids::InsertionIds;
pub use metrics::{Metrics, MetricsSnapshot};
pub use namespace::{Namespace, DEFAULT_FILE_STEM, FILTER_EXTENSION};

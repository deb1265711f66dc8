//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Fixed-size bloom filter stages
//! - The scaling (growable) filter built from those stages
//! - Hash functions and parameter calculations
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - Pure functions where possible

pub mod bloom_filter;
pub mod config;
pub mod hash_functions;
pub mod parameters;
pub mod scaling;

pub use bloom_filter::BloomFilter;
pub use config::FilterConfig;
pub use parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
pub use scaling::{FilterStage, ScalingBloomFilter};

//! Filter configuration and validation
//!
//! # Example
//!
//! ```
//! use nsbloom_filters::FilterConfig;
//!
//! let config = FilterConfig::default()
//!     .with_capacity(10_000)
//!     .with_error_rate(0.01);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::FilterError;
use serde::{Deserialize, Serialize};

/// Sizing of a scaling bloom filter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Elements per stage before a new stage is appended
    pub capacity: usize,
    /// Target false positive rate of the first stage
    pub error_rate: f64,
    /// Factor applied to the error rate of every additional stage
    pub tightening_ratio: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            error_rate: 0.05,
            tightening_ratio: 0.5,
        }
    }
}

impl FilterConfig {
    /// Create a validated configuration
    pub fn new(capacity: usize, error_rate: f64) -> Result<Self, FilterError> {
        let config = Self::default()
            .with_capacity(capacity)
            .with_error_rate(error_rate);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.capacity == 0 {
            return Err(FilterError::InvalidParameters(
                "capacity cannot be 0".to_string(),
            ));
        }

        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(FilterError::InvalidParameters(format!(
                "error_rate must be in (0, 1), got {}",
                self.error_rate
            )));
        }

        if !(self.tightening_ratio > 0.0 && self.tightening_ratio <= 1.0) {
            return Err(FilterError::InvalidParameters(format!(
                "tightening_ratio must be in (0, 1], got {}",
                self.tightening_ratio
            )));
        }

        Ok(())
    }

    /// Error rate of the stage at `index` (0-based)
    pub fn stage_error_rate(&self, index: usize) -> f64 {
        let exponent = i32::try_from(index).unwrap_or(i32::MAX);
        self.error_rate * self.tightening_ratio.powi(exponent)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    pub fn with_tightening_ratio(mut self, ratio: f64) -> Self {
        self.tightening_ratio = ratio;
        self
    }
}

//! Scaling bloom filter: a growable series of fixed-size stages
//!
//! Each stage holds up to `capacity` elements. When the newest stage is full a
//! new one is appended with a tighter error rate
//! (`error_rate * tightening_ratio^i`), which keeps the compound false
//! positive rate bounded by roughly `error_rate / (1 - tightening_ratio)`.
//!
//! Every stage remembers the range of insertion ids it absorbed.

use serde::{Deserialize, Serialize};

use super::bloom_filter::BloomFilter;
use super::config::FilterConfig;
use super::hash_functions::KeyHashes;

/// One stage of a scaling filter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterStage {
    filter: BloomFilter,
    first_id: Option<u64>,
    last_id: Option<u64>,
}

impl FilterStage {
    fn new(config: &FilterConfig, index: usize) -> Self {
        Self {
            filter: BloomFilter::new_with_fpr(config.capacity, config.stage_error_rate(index)),
            first_id: None,
            last_id: None,
        }
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// Inclusive range of insertion ids recorded in this stage
    pub fn id_range(&self) -> Option<(u64, u64)> {
        self.first_id.zip(self.last_id)
    }
}

/// Growable bloom filter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalingBloomFilter {
    config: FilterConfig,
    stages: Vec<FilterStage>,
}

impl ScalingBloomFilter {
    /// Create an empty filter with a single stage
    pub fn new(config: FilterConfig) -> Self {
        let stages = vec![FilterStage::new(&config, 0)];
        Self { config, stages }
    }

    /// Insert `key`, tagging it with insertion id `id`
    pub fn add(&mut self, key: &[u8], id: u64) {
        let hashes = KeyHashes::new(key);
        let stage = self.writable_stage();

        stage.filter.insert_hashed(&hashes);
        stage.first_id.get_or_insert(id);
        stage.last_id = Some(stage.last_id.map_or(id, |last| last.max(id)));
    }

    /// Whether `key` may have been inserted (no false negatives)
    pub fn check(&self, key: &[u8]) -> bool {
        let hashes = KeyHashes::new(key);
        // Newest stages see the most recent traffic, probe them first.
        self.stages
            .iter()
            .rev()
            .any(|stage| stage.filter.contains_hashed(&hashes))
    }

    fn writable_stage(&mut self) -> &mut FilterStage {
        let full = self
            .stages
            .last()
            .map_or(true, |stage| stage.filter.elements_inserted() >= self.config.capacity);

        if full {
            let index = self.stages.len();
            tracing::debug!(stage = index, "Appending bloom filter stage");
            self.stages.push(FilterStage::new(&self.config, index));
        }

        let last = self.stages.len() - 1;
        &mut self.stages[last]
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Total elements inserted across all stages
    pub fn len(&self) -> usize {
        self.stages.iter().map(|s| s.filter.elements_inserted()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest insertion id recorded by any stage
    pub fn max_id(&self) -> Option<u64> {
        self.stages.iter().filter_map(|s| s.last_id).max()
    }

    /// Approximate in-memory size of the bit arrays in bytes
    pub fn size_bytes(&self) -> usize {
        self.stages.iter().map(|s| s.filter.size_bits().div_ceil(8)).sum()
    }

    /// Whether a decoded filter is internally consistent
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.stages.is_empty()
            && self.config.validate().is_ok()
            && self.stages.iter().all(|s| s.filter.is_well_formed())
    }
}

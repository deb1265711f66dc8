//! Fixed-size bloom filter, one stage of a [`ScalingBloomFilter`]
//!
//! INVARIANTS:
//! - FPR = (1 - e^(-kn/m))^k <= target rate while n <= capacity
//! - No false negatives: once inserted, `contains()` MUST return true
//!
//! [`ScalingBloomFilter`]: super::ScalingBloomFilter

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::KeyHashes;
use super::parameters::{calculate_fpr, calculate_optimal_parameters};

/// Bloom filter for probabilistic membership testing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomFilter {
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions
    k: usize,
    /// Size in bits
    m: usize,
    /// Elements inserted
    n: usize,
}

/// Serde support for BitVec: raw bytes plus bit length
mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (bits.as_raw_slice(), bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        if len > bytes.len() * 8 {
            return Err(serde::de::Error::custom(format!(
                "bit length {len} exceeds {} stored bytes",
                bytes.len()
            )));
        }
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create a filter with `m` bits and `k` hash functions
    pub fn new(m: usize, k: usize) -> Self {
        let m = m.max(1);
        Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k: k.max(1),
            m,
            n: 0,
        }
    }

    /// Create a filter sized for `expected_elements` at `target_fpr`
    pub fn new_with_fpr(expected_elements: usize, target_fpr: f64) -> Self {
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        Self::new(params.size_bits, params.hash_count)
    }

    pub fn insert(&mut self, key: &[u8]) {
        self.insert_hashed(&KeyHashes::new(key));
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.contains_hashed(&KeyHashes::new(key))
    }

    pub(crate) fn insert_hashed(&mut self, hashes: &KeyHashes) {
        for pos in hashes.positions(self.k, self.m) {
            self.bits.set(pos, true);
        }
        self.n += 1;
    }

    pub(crate) fn contains_hashed(&self, hashes: &KeyHashes) -> bool {
        hashes.positions(self.k, self.m).all(|pos| self.bits[pos])
    }

    /// Whether the decoded state is internally consistent
    pub(crate) fn is_well_formed(&self) -> bool {
        self.m > 0 && self.k > 0 && self.bits.len() == self.m
    }

    /// Current false positive rate, `(1 - e^(-kn/m))^k`
    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.k)
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn size_bits(&self) -> usize {
        self.m
    }

    pub fn hash_count(&self) -> usize {
        self.k
    }

    pub fn elements_inserted(&self) -> usize {
        self.n
    }
}

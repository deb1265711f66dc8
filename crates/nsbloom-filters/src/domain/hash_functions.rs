//! Hash functions for the bloom filter stages
//!
//! MurmurHash3 (x64, 128-bit) with two seeds feeds the double hashing scheme
//! `h(i) = h1 + i * h2`, so a key is hashed twice no matter how large `k` is.

use std::io::Cursor;

/// Lower 64 bits of MurmurHash3 x64_128 for `key` under `seed`
pub fn murmur_hash(key: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(key);
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0) as u64
}

/// The pair of base hashes shared by every stage of a scaling filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyHashes {
    h1: u64,
    h2: u64,
}

impl KeyHashes {
    /// Hash `key` once; the result can be probed against any number of stages
    pub fn new(key: &[u8]) -> Self {
        Self {
            h1: murmur_hash(key, 0),
            h2: murmur_hash(key, 1),
        }
    }

    /// Bit positions for a filter with `k` hash functions over `m` bits
    pub fn positions(&self, k: usize, m: usize) -> impl Iterator<Item = usize> + '_ {
        let m = m.max(1) as u64;
        (0..k as u64).map(move |i| (self.h1.wrapping_add(i.wrapping_mul(self.h2)) % m) as usize)
    }
}

//! Random sources for timing jitter
//!
//! The reveal draws one delay per character. Production uses a seeded
//! generator initialised from process entropy; tests inject a fixed seed or
//! their own [`RandomSource`].

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

/// A source of uniformly distributed values in `[0, 1)`
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// SplitMix64 generator
#[derive(Clone, Debug)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the standard library's per-process hash keys
    pub fn from_entropy() -> Self {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u64(0x6f76_6572_7475_7265);
        Self::new(hasher.finish())
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        // Top 53 bits give an exact f64 in [0, 1)
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

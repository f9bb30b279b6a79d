//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through LootRng instances derived
//! from the single master seed handed to the engine.
//!
//! Each stream is seeded from (master_seed XOR slot). Adding a new
//! stream never changes the draws of existing ones.

use rand::{seq::SliceRandom, Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG stream.
pub struct LootRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl LootRng {
    /// Create a stream from the master seed and a stable slot index.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Convenience for tests and tools: a single stream from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(seed, 0)
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float in [0.0, 100.0). Used for percent-scale draws.
    pub fn next_percent(&mut self) -> f64 {
        self.next_f64() * 1e2
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Pick an index in [0, len). Returns None for an empty range.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.inner.gen_range(0..len))
    }

    /// Inclusive integer range draw. Bounds are normalised, so
    /// `range_i32(5, 2)` draws from 2..=5. Equal bounds return the bound.
    pub fn range_i32(&mut self, a: i32, b: i32) -> i32 {
        if a == b {
            return a;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        self.inner.gen_range(lo..=hi)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

/// Derives every stream of one engine from its master seed.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stream(&self, slot: StreamSlot) -> LootRng {
        LootRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries, only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Population = 0,
    Repopulation = 1,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Repopulation => "repopulation",
        }
    }
}

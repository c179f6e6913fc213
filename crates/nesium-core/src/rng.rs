//! Seedable pseudo-random number generator.
//!
//! `SplitMix64` drives every stochastic decision a caller layers on top of the
//! otherwise deterministic core (sticky inputs, randomized agents). Its whole
//! state is one `u64`, so it can be captured and rewound alongside a save
//! state. It is **not** cryptographically secure.

#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

/// A small PRNG based on SplitMix64.
///
/// Any `seed` is valid, including 0. Different seeds yield different sequences.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Creates a new generator seeded with `seed`.
    #[inline]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Raw generator state. Feeding it back to [`SplitMix64::new`] resumes the
    /// same sequence.
    #[inline]
    pub const fn state(&self) -> u64 {
        self.state
    }

    /// Advances the generator and returns the next pseudo-random `u64`.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);

        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform sample in `[0, 1)` built from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Returns `true` with probability `p`.
    ///
    /// `p <= 0` never fires and `p >= 1` always fires; both still advance the
    /// generator so a trajectory's draw count does not depend on `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

impl Default for SplitMix64 {
    fn default() -> Self {
        Self::new(0x6A09_E667_F3BC_C909)
    }
}

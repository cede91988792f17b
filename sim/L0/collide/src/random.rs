//! Seeded linear congruential generator.
//!
//! The generator is an explicit value rather than global state: create one
//! per simulation (or per test) and pass it where randomness is needed, so
//! geometric edge cases replay exactly from a seed.
//!
//! It implements [`rand::RngCore`] and [`rand::SeedableRng`], so the whole
//! `rand::Rng` API is available on top of the raw sequence.
//!
//! # Example
//!
//! ```
//! use sim_collide::random::LcgRng;
//!
//! let mut rng = LcgRng::new(0);
//! assert_eq!(rng.next_raw(), 0x3c6e_f35f);
//! assert!(rng.next_int(10) < 10);
//! ```

use rand::{RngCore, SeedableRng};

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;

/// 32-bit linear congruential generator (`seed = 1664525 * seed + 1013904223`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LcgRng {
    seed: u32,
}

impl LcgRng {
    /// Create a generator with the given seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Current seed. Restoring it with [`LcgRng::set_seed`] replays the sequence.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Replace the seed.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    /// Advance and return the raw 32-bit state.
    pub fn next_raw(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        self.seed
    }

    /// Uniform-ish integer in `0..n`, or 0 when `n == 0`.
    ///
    /// High bits are xor-folded into the low bits before the modulus, since
    /// the low bits of an LCG have short periods.
    pub fn next_int(&mut self, n: u32) -> u32 {
        let mut r = self.next_raw();
        if n == 0 {
            return 0;
        }
        if n <= 0x0001_0000 {
            r ^= r >> 16;
            if n <= 0x0000_0100 {
                r ^= r >> 8;
                if n <= 0x0000_0010 {
                    r ^= r >> 4;
                    if n <= 0x0000_0004 {
                        r ^= r >> 2;
                        if n <= 0x0000_0002 {
                            r ^= r >> 1;
                        }
                    }
                }
            }
        }
        r % n
    }

    /// Real number in `[0, 1]`.
    pub fn next_real(&mut self) -> f64 {
        f64::from(self.next_raw()) / f64::from(u32::MAX)
    }
}

impl RngCore for LcgRng {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_raw());
        let lo = u64::from(self.next_raw());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for LcgRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

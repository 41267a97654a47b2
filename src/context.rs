//! Random source for workload generation.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// One exclusively-owned random stream per run.
///
/// Seeded streams are deterministic; unseeded streams draw their state from
/// the operating system and are cryptographically strong.
pub struct RandomSource {
    seed: Option<u64>,
    rng: StdRng,
}

impl RandomSource {
    /// Deterministic stream for the given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            seed: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded if `seed` is given, entropy otherwise.
    pub fn from_seed_or_entropy(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// The seed, if this stream was created from one.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

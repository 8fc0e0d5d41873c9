//! Per-worker PRNG built on `rand`'s small, seedable generator so each
//! simulation thread gets an independent, reproducible stream.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub struct Rng {
    inner: SmallRng,
}

impl Rng {
    pub fn from_seed(seed: u64) -> Self {
        Rng { inner: SmallRng::seed_from_u64(seed) }
    }

    /// Uniform sample in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

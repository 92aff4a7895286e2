// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Seeded randomness for deployments and movement.
//!
//! Everything random in a simulation draws from one [`SimRng`], so a seed
//! fully determines node placement, movement and program-side draws.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG owned by the simulator.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// RNG seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Child RNG seeded from this stream, for components whose draws must not
    /// shift everyone else's.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self::new(self.inner.next_u64())
    }

    /// Uniform sample in `[0, 1)`.
    pub fn sample_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform sample in `[low, high]`; returns `low` when the range is empty.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.inner.gen_range(low..=high)
        } else {
            low
        }
    }

    /// Normal sample via the Box-Muller transform.
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.sample_f64();
        let u2 = self.sample_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        stddev.mul_add(z, mean)
    }

    /// Underlying generator, for callers that need the full `rand` API.
    pub fn inner_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.inner
    }
}

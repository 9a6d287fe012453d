//! Seeded RNG for Deterministic Simulation Testing
//!
//! Given the same seed, every delay and throttle decision is replayed
//! identically, so a failing simulation run can be reproduced from its seed.

use super::Rng;

/// Simulated RNG - deterministic based on seed
pub struct SimulatedRng {
    inner: rand_chacha::ChaCha8Rng,
}

impl SimulatedRng {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        SimulatedRng {
            inner: rand_chacha::ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl std::fmt::Debug for SimulatedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRng").finish_non_exhaustive()
    }
}

impl Rng for SimulatedRng {
    fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    fn gen_bool(&mut self, probability: f64) -> bool {
        use rand::Rng;
        self.inner.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        use rand::Rng;
        if min >= max {
            return min;
        }
        self.inner.gen_range(min..max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_rng_deterministic() {
        let mut rng1 = SimulatedRng::new(12345);
        let mut rng2 = SimulatedRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_simulated_rng_bool_sequence_replays() {
        let mut rng1 = SimulatedRng::new(7);
        let mut rng2 = SimulatedRng::new(7);

        let a: Vec<bool> = (0..50).map(|_| rng1.gen_bool(0.3)).collect();
        let b: Vec<bool> = (0..50).map(|_| rng2.gen_bool(0.3)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simulated_rng_clamps_probability() {
        let mut rng = SimulatedRng::new(1);

        // Out-of-range inputs must not panic inside rand
        assert!(rng.gen_bool(2.0));
        assert!(!rng.gen_bool(-1.0));
    }
}

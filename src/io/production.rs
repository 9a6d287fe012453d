use super::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Entropy-seeded RNG for runs that do not need replay
pub struct ProductionRng {
    inner: StdRng,
}

impl ProductionRng {
    pub fn new() -> Self {
        ProductionRng {
            inner: StdRng::from_entropy(),
        }
    }
}

impl Default for ProductionRng {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProductionRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionRng").finish_non_exhaustive()
    }
}

impl Rng for ProductionRng {
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

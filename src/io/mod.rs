//! Randomness Abstraction
//!
//! Every probabilistic decision in the inconsistency layer draws from an
//! `Rng` supplied at construction time, so simulation tests can pin a seed
//! (or force a probability of 0.0 / 1.0) and replay the exact fault sequence.
//!
//! Implementations:
//! - `ProductionRng`: entropy-seeded, for long-running integration rigs
//! - `SimulatedRng`: ChaCha8 seeded from a `u64`, for deterministic tests

pub mod production;
pub mod simulation;

pub use production::ProductionRng;
pub use simulation::SimulatedRng;

/// Source of random draws used for delay and throttle decisions
pub trait Rng: Send + 'static {
    /// Next raw 64-bit value
    fn next_u64(&mut self) -> u64;

    /// True with the given probability (clamped to [0, 1])
    fn gen_bool(&mut self, probability: f64) -> bool;

    /// Uniform value in `[min, max)`; returns `min` when the range is empty
    fn gen_range(&mut self, min: u64, max: u64) -> u64;
}

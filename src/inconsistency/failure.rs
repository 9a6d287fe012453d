//! Throttle injection with a bounded failure budget.
//!
//! `maybe_fail` runs first on every decorated call. When it fires, the call is
//! rejected before the underlying store or the delay maps are touched.

use super::config::{valid_probability, ConfigError};
use super::SharedRng;
use crate::io::Rng;
use crate::store::{StoreError, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Decides, per call, whether to raise a simulated throttle
pub struct FailureInjector<R: Rng> {
    rng: SharedRng<R>,
    /// f64 bits, so the probability can be changed through `&self`
    throttle_probability: AtomicU64,
    /// 0 means no limit
    failure_limit: AtomicU64,
    /// Failures actually injected since the last reset
    failure_count: AtomicU64,
}

impl<R: Rng> FailureInjector<R> {
    pub fn new(
        rng: SharedRng<R>,
        throttle_probability: f64,
        failure_limit: u64,
    ) -> Result<Self, ConfigError> {
        let p = valid_probability("throttle_probability", throttle_probability)?;
        Ok(FailureInjector {
            rng,
            throttle_probability: AtomicU64::new(p.to_bits()),
            failure_limit: AtomicU64::new(failure_limit),
            failure_count: AtomicU64::new(0),
        })
    }

    /// Fail with `StoreError::Throttled` if the draw fires and the budget
    /// allows it; otherwise succeed with no side effect.
    pub fn maybe_fail(&self, operation: &'static str) -> StoreResult<()> {
        let probability = self.throttle_probability();
        if probability <= 0.0 {
            return Ok(());
        }
        if !self.rng.lock().gen_bool(probability) {
            return Ok(());
        }

        let limit = self.failure_limit.load(Ordering::SeqCst);
        let failure_count = if limit == 0 {
            self.failure_count.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            // Check-and-increment in one step so racing callers cannot overshoot
            match self
                .failure_count
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                    (c < limit).then_some(c + 1)
                }) {
                Ok(previous) => previous + 1,
                Err(_) => return Ok(()),
            }
        };

        debug!(operation, failure_count, "injecting throttle");
        Err(StoreError::Throttled { failure_count })
    }

    /// Replace the budget and reset the count
    pub fn set_failure_limit(&self, limit: u64) {
        self.failure_limit.store(limit, Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
    }

    pub fn failure_limit(&self) -> u64 {
        self.failure_limit.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    pub fn throttle_probability(&self) -> f64 {
        f64::from_bits(self.throttle_probability.load(Ordering::SeqCst))
    }

    pub fn set_throttle_probability(&self, probability: f64) -> Result<(), ConfigError> {
        let p = valid_probability("throttle_probability", probability)?;
        self.throttle_probability.store(p.to_bits(), Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SimulatedRng;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn injector(probability: f64, limit: u64) -> FailureInjector<SimulatedRng> {
        FailureInjector::new(Arc::new(Mutex::new(SimulatedRng::new(42))), probability, limit)
            .unwrap()
    }

    #[test]
    fn test_never_fails_at_zero_probability() {
        let injector = injector(0.0, 0);

        for _ in 0..100 {
            assert!(injector.maybe_fail("put").is_ok());
        }
        assert_eq!(injector.failure_count(), 0);
    }

    #[test]
    fn test_unlimited_budget_always_fails() {
        let injector = injector(1.0, 0);

        for i in 1..=50u64 {
            match injector.maybe_fail("list") {
                Err(StoreError::Throttled { failure_count }) => assert_eq!(failure_count, i),
                other => panic!("expected throttle, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_budget_allows_exactly_n_failures() {
        let injector = injector(1.0, 3);

        for _ in 0..3 {
            assert!(injector.maybe_fail("delete").is_err());
        }
        for _ in 0..10 {
            assert!(injector.maybe_fail("delete").is_ok());
        }
        assert_eq!(injector.failure_count(), 3);
    }

    #[test]
    fn test_set_failure_limit_resets_count() {
        let injector = injector(1.0, 2);

        assert!(injector.maybe_fail("put").is_err());
        assert!(injector.maybe_fail("put").is_err());
        assert!(injector.maybe_fail("put").is_ok());

        injector.set_failure_limit(1);
        assert_eq!(injector.failure_count(), 0);
        assert_eq!(injector.failure_limit(), 1);
        assert!(injector.maybe_fail("put").is_err());
        assert!(injector.maybe_fail("put").is_ok());
    }

    #[test]
    fn test_throttle_probability_validated() {
        assert!(FailureInjector::new(Arc::new(Mutex::new(SimulatedRng::new(1))), 1.2, 0).is_err());

        let injector = injector(0.0, 0);
        assert!(injector.set_throttle_probability(-0.5).is_err());
        assert_eq!(injector.throttle_probability(), 0.0);

        injector.set_throttle_probability(0.25).unwrap();
        assert_eq!(injector.throttle_probability(), 0.25);
    }

    #[test]
    fn test_budget_holds_under_contention() {
        let injector = Arc::new(injector(1.0, 100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let injector = Arc::clone(&injector);
                std::thread::spawn(move || {
                    (0..50).filter(|_| injector.maybe_fail("put").is_err()).count()
                })
            })
            .collect();

        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 100);
        assert_eq!(injector.failure_count(), 100);
    }
}

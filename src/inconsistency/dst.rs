//! Deterministic Simulation Testing for the inconsistent store
//!
//! VOPR-style harness that drives an `InconsistentObjectStore` over the
//! in-memory backend with:
//! - Seeded random operations (put, delete, batch delete, listings, clear)
//! - Virtual time advanced by the harness, never the wall clock
//! - A shadow model of the delay windows, checked against every listing
//!
//! Throttles are drawn from the store's own RNG; the model only observes
//! them and treats a throttled call as a no-op.

use super::config::{ConfigError, InconsistencyConfig};
use super::store::InconsistentObjectStore;
use crate::clock::{SimulatedClock, StoreClock};
use crate::io::{Rng, SimulatedRng};
use crate::store::{
    DeleteObjectRequest, DeleteObjectsRequest, InMemoryObjectStore, ListObjectsRequest,
    ObjectStore, PutObjectRequest, StoreError, StoreResult,
};
use futures::executor::block_on;
use std::collections::{BTreeSet, HashMap};

const BUCKET: &str = "dst";
const DELAY_MARKER: &str = "DELAY_";

/// Configuration for inconsistency DST
#[derive(Debug, Clone)]
pub struct InconsistencyDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub delay_msec: u64,
    pub throttle_probability: f64,
    /// 0 means no limit
    pub failure_limit: u64,
    /// Upper bound for a single clock advance
    pub max_advance_ms: u64,
    /// Probability of a `clear_inconsistency` call
    pub clear_prob: f64,
    /// Directories at the top level; keys also nest one level below each
    pub num_dirs: u64,
    pub num_files: u64,
}

impl Default for InconsistencyDSTConfig {
    fn default() -> Self {
        InconsistencyDSTConfig {
            seed: 0,
            delay_msec: 1_000,
            throttle_probability: 0.0,
            failure_limit: 0,
            max_advance_ms: 400,
            clear_prob: 0.01,
            num_dirs: 3,
            num_files: 4,
        }
    }
}

impl InconsistencyDSTConfig {
    pub fn new(seed: u64) -> Self {
        InconsistencyDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Frequent throttles with a bounded budget
    pub fn throttled(seed: u64) -> Self {
        InconsistencyDSTConfig {
            seed,
            throttle_probability: 0.3,
            failure_limit: 25,
            ..Default::default()
        }
    }

    /// Long windows, short clock steps, unlimited throttles
    pub fn high_chaos(seed: u64) -> Self {
        InconsistencyDSTConfig {
            seed,
            delay_msec: 5_000,
            throttle_probability: 0.2,
            failure_limit: 0,
            max_advance_ms: 200,
            clear_prob: 0.005,
            num_dirs: 2,
            num_files: 3,
        }
    }

    fn store_config(&self) -> InconsistencyConfig {
        InconsistencyConfig {
            delay_key_substring: DELAY_MARKER.to_string(),
            delay_key_probability: 1.0,
            delay_key_msec: self.delay_msec,
            throttle_probability: self.throttle_probability,
            failure_limit: self.failure_limit,
        }
    }
}

/// Operation type for logging
#[derive(Debug, Clone)]
pub enum InconsistencyOp {
    Put { key: String },
    Delete { key: String },
    DeleteBatch { keys: Vec<String> },
    ListRecursive { prefix: String },
    ListDelimited { prefix: String },
    Advance { ms: u64 },
    Clear,
}

/// Result of an inconsistency DST run
#[derive(Debug, Clone)]
pub struct InconsistencyDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub puts: u64,
    pub deletes: u64,
    pub listings: u64,
    pub throttled: u64,
    pub clears: u64,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<InconsistencyOp>,
}

impl InconsistencyDSTResult {
    pub fn new(seed: u64) -> Self {
        InconsistencyDSTResult {
            seed,
            total_operations: 0,
            puts: 0,
            deletes: 0,
            listings: 0,
            throttled: 0,
            clears: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (put:{}, delete:{}, list:{}, throttled:{}, clear:{}), {} violations",
            self.seed,
            self.total_operations,
            self.puts,
            self.deletes,
            self.listings,
            self.throttled,
            self.clears,
            self.invariant_violations.len()
        )
    }
}

/// Expected view of the delay windows
#[derive(Debug, Default)]
struct ShadowModel {
    /// Keys present in the underlying store
    objects: BTreeSet<String>,
    /// key -> time of the last delayed put
    puts: HashMap<String, u64>,
    /// key -> (time of the last delayed delete, summary captured)
    deletes: HashMap<String, (u64, bool)>,
    window_ms: u64,
}

impl ShadowModel {
    fn eligible(key: &str) -> bool {
        key.contains(DELAY_MARKER)
    }

    fn hidden(&self, key: &str, now: u64) -> bool {
        self.puts
            .get(key)
            .is_some_and(|&at| now.saturating_sub(at) < self.window_ms)
    }

    fn active_delete(&self, key: &str, now: u64) -> Option<bool> {
        self.deletes
            .get(key)
            .filter(|(at, _)| now.saturating_sub(*at) < self.window_ms)
            .map(|(_, captured)| *captured)
    }

    /// A key is listed if the store has it outside a put window, or a
    /// delete window holds a captured summary for it
    fn listed(&self, key: &str, now: u64) -> bool {
        (self.objects.contains(key) && !self.hidden(key, now))
            || self.active_delete(key, now) == Some(true)
    }

    fn candidates(&self, now: u64) -> BTreeSet<&str> {
        self.objects
            .iter()
            .map(String::as_str)
            .chain(
                self.deletes
                    .keys()
                    .filter(|k| self.active_delete(k, now).is_some())
                    .map(String::as_str),
            )
            .collect()
    }

    fn expected_recursive(&self, prefix: &str, now: u64) -> BTreeSet<String> {
        self.candidates(now)
            .into_iter()
            .filter(|k| k.starts_with(prefix) && self.listed(k, now))
            .map(str::to_string)
            .collect()
    }

    /// (direct children, rolled-up prefixes) for a prefix ending in `/`
    fn expected_delimited(&self, prefix: &str, now: u64) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut children = BTreeSet::new();
        let mut prefixes = BTreeSet::new();
        for key in self.candidates(now) {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            match rest.find('/') {
                None => {
                    if self.listed(key, now) {
                        children.insert(key.to_string());
                    }
                }
                Some(idx) => {
                    prefixes.insert(format!("{}{}", prefix, &rest[..=idx]));
                }
            }
        }
        (children, prefixes)
    }

    fn put(&mut self, key: &str, now: u64) {
        self.objects.insert(key.to_string());
        if Self::eligible(key) {
            self.puts.insert(key.to_string(), now);
        }
    }

    /// Capture decisions are made against the pre-delete state
    fn captured(&self, key: &str, now: u64) -> bool {
        self.objects.contains(key) && !self.hidden(key, now)
    }

    fn delete(&mut self, key: &str, captured: bool, now: u64) {
        self.objects.remove(key);
        if Self::eligible(key) {
            self.deletes.insert(key.to_string(), (now, captured));
        }
    }

    fn clear(&mut self) {
        self.puts.clear();
        self.deletes.clear();
    }
}

type DstStore =
    InconsistentObjectStore<InMemoryObjectStore<SimulatedClock>, SimulatedRng, SimulatedClock>;

/// DST harness for `InconsistentObjectStore`
pub struct InconsistencyDSTHarness {
    config: InconsistencyDSTConfig,
    rng: SimulatedRng,
    clock: SimulatedClock,
    store: DstStore,
    model: ShadowModel,
    result: InconsistencyDSTResult,
}

impl InconsistencyDSTHarness {
    pub fn new(config: InconsistencyDSTConfig) -> Result<Self, ConfigError> {
        let clock = SimulatedClock::new(1_000_000);
        let inner = InMemoryObjectStore::with_clock(clock.clone()).with_bucket(BUCKET);
        // The store draws from its own stream so op generation stays independent
        let store_rng = SimulatedRng::new(config.seed.wrapping_add(0x9E37_79B9_7F4A_7C15));
        let store = InconsistentObjectStore::with_parts(
            inner,
            config.store_config(),
            store_rng,
            clock.clone(),
        )?;

        Ok(InconsistencyDSTHarness {
            rng: SimulatedRng::new(config.seed),
            model: ShadowModel {
                window_ms: config.delay_msec,
                ..Default::default()
            },
            clock,
            store,
            result: InconsistencyDSTResult::new(config.seed),
            config,
        })
    }

    pub fn with_seed(seed: u64) -> Result<Self, ConfigError> {
        Self::new(InconsistencyDSTConfig::new(seed))
    }

    fn now(&self) -> u64 {
        self.clock.now().as_millis()
    }

    fn random_dir(&mut self) -> String {
        format!("d{}/", self.rng.gen_range(0, self.config.num_dirs))
    }

    fn random_key(&mut self) -> String {
        let dir = self.random_dir();
        let nested = if self.rng.gen_bool(0.3) { "sub/" } else { "" };
        let marker = if self.rng.gen_bool(0.6) { DELAY_MARKER } else { "" };
        let file = self.rng.gen_range(0, self.config.num_files);
        format!("{}{}{}f{}", dir, nested, marker, file)
    }

    /// Record a throttle, or pass the outcome through
    fn observe<T>(&mut self, outcome: StoreResult<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(StoreError::Throttled { .. }) => {
                self.result.throttled += 1;
                None
            }
            Err(e) => {
                self.violation(format!("unexpected store error: {}", e));
                None
            }
        }
    }

    fn violation(&mut self, message: String) {
        self.result.invariant_violations.push(format!(
            "Op #{}: {:?} - {}",
            self.result.total_operations, self.result.last_op, message
        ));
    }

    fn run_single_op(&mut self) {
        self.result.total_operations += 1;
        let op_type = self.rng.gen_range(0, 100);

        if self.rng.gen_bool(self.config.clear_prob) {
            self.result.last_op = Some(InconsistencyOp::Clear);
            self.store.clear_inconsistency();
            self.model.clear();
            self.result.clears += 1;
        } else if op_type < 25 {
            let key = self.random_key();
            self.result.last_op = Some(InconsistencyOp::Put { key: key.clone() });
            let outcome = block_on(self.store.put_object(PutObjectRequest::new(
                BUCKET,
                key.clone(),
                key.clone().into_bytes(),
            )));
            if self.observe(outcome).is_some() {
                let now = self.now();
                self.model.put(&key, now);
                self.result.puts += 1;
            }
        } else if op_type < 40 {
            let key = self.random_key();
            self.result.last_op = Some(InconsistencyOp::Delete { key: key.clone() });
            let now = self.now();
            let captured = self.model.captured(&key, now);
            let outcome = block_on(
                self.store
                    .delete_object(DeleteObjectRequest::new(BUCKET, key.clone())),
            );
            if self.observe(outcome).is_some() {
                self.model.delete(&key, captured, now);
                self.result.deletes += 1;
            }
        } else if op_type < 48 {
            let count = self.rng.gen_range(1, 4);
            let keys: Vec<String> = (0..count)
                .map(|_| self.random_key())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            self.result.last_op = Some(InconsistencyOp::DeleteBatch { keys: keys.clone() });
            let now = self.now();
            let captured: Vec<bool> = keys.iter().map(|k| self.model.captured(k, now)).collect();
            let outcome = block_on(
                self.store
                    .delete_objects(DeleteObjectsRequest::new(BUCKET, keys.clone())),
            );
            if let Some(result) = self.observe(outcome) {
                if result.deleted.len() != keys.len() {
                    self.violation(format!("batch deleted {:?}", result.deleted));
                }
                for (key, captured) in keys.iter().zip(captured) {
                    self.model.delete(key, captured, now);
                }
                self.result.deletes += keys.len() as u64;
            }
        } else if op_type < 65 {
            let prefix = if self.rng.gen_bool(0.3) {
                String::new()
            } else {
                self.random_dir()
            };
            self.result.last_op = Some(InconsistencyOp::ListRecursive {
                prefix: prefix.clone(),
            });
            let outcome = block_on(
                self.store
                    .list_objects(ListObjectsRequest::recursive(BUCKET, prefix.clone())),
            );
            if let Some(listing) = self.observe(outcome) {
                self.result.listings += 1;
                let actual: BTreeSet<String> =
                    listing.summaries.into_iter().map(|s| s.key).collect();
                let expected = self.model.expected_recursive(&prefix, self.now());
                if actual != expected {
                    self.violation(format!(
                        "recursive listing mismatch: actual={:?}, expected={:?}",
                        actual, expected
                    ));
                }
            }
        } else if op_type < 80 {
            let prefix = self.random_dir();
            self.result.last_op = Some(InconsistencyOp::ListDelimited {
                prefix: prefix.clone(),
            });
            let outcome = block_on(
                self.store
                    .list_objects(ListObjectsRequest::delimited(BUCKET, prefix.clone())),
            );
            if let Some(listing) = self.observe(outcome) {
                self.result.listings += 1;
                let children: BTreeSet<String> =
                    listing.summaries.into_iter().map(|s| s.key).collect();
                let prefixes: BTreeSet<String> = listing.common_prefixes.into_iter().collect();
                let (expected_children, expected_prefixes) =
                    self.model.expected_delimited(&prefix, self.now());
                if children != expected_children || prefixes != expected_prefixes {
                    self.violation(format!(
                        "delimited listing mismatch: actual=({:?}, {:?}), expected=({:?}, {:?})",
                        children, prefixes, expected_children, expected_prefixes
                    ));
                }
            }
        } else {
            let ms = self.rng.gen_range(0, self.config.max_advance_ms + 1);
            self.result.last_op = Some(InconsistencyOp::Advance { ms });
            self.clock.advance_ms(ms);
        }

        if let Err(violation) = self.check_invariants() {
            self.violation(violation);
        }
    }

    fn check_invariants(&self) -> Result<(), String> {
        // Invariant 1: the failure budget is never exceeded
        let limit = self.config.failure_limit;
        if limit > 0 && self.store.failure_count() > limit {
            return Err(format!(
                "failure count {} exceeds limit {}",
                self.store.failure_count(),
                limit
            ));
        }

        // Invariant 2: every observed throttle was counted
        if self.store.failure_count() != self.result.throttled {
            return Err(format!(
                "failure count {} != observed throttles {}",
                self.store.failure_count(),
                self.result.throttled
            ));
        }

        // Invariant 3: the underlying store is strongly consistent
        let inner_count = self.store.inner().object_count(BUCKET);
        if inner_count != self.model.objects.len() {
            return Err(format!(
                "underlying store has {} objects, model has {}",
                inner_count,
                self.model.objects.len()
            ));
        }

        // Invariant 4: put entries are never purged, only cleared
        let state = self.store.state();
        if state.pending_puts() != self.model.puts.len() {
            return Err(format!(
                "store holds {} delayed puts, model {}",
                state.pending_puts(),
                self.model.puts.len()
            ));
        }

        Ok(())
    }

    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();
            if !self.result.invariant_violations.is_empty() {
                break;
            }
        }
    }

    pub fn result(&self) -> &InconsistencyDSTResult {
        &self.result
    }

    pub fn store(&self) -> &DstStore {
        &self.store
    }
}

/// Run a batch of DST tests
pub fn run_inconsistency_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> InconsistencyDSTConfig,
) -> Vec<InconsistencyDSTResult> {
    (0..num_seeds)
        .map(|i| {
            let seed = start_seed + i as u64;
            match InconsistencyDSTHarness::new(config_fn(seed)) {
                Ok(mut harness) => {
                    harness.run(ops_per_seed);
                    harness.result().clone()
                }
                Err(e) => {
                    let mut result = InconsistencyDSTResult::new(seed);
                    result.invariant_violations.push(format!("invalid config: {}", e));
                    result
                }
            }
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_inconsistency_batch(results: &[InconsistencyDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();
    let total_throttled: u64 = results.iter().map(|r| r.throttled).sum();

    let mut summary = format!(
        "Inconsistency DST Summary\n\
         =========================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {}, throttled: {}\n",
        total, passed, failed, total_ops, total_throttled
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  Seed {}: {}\n", result.seed, result.summary()));
            for violation in &result.invariant_violations {
                summary.push_str(&format!("    - {}\n", violation));
            }
        }
    }

    summary
}

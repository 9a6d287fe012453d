//! Inconsistent Object Store
//!
//! A fault-injecting decorator over any `ObjectStore` that simulates two
//! classes of object-store anomalies, so retry and consistency logic above
//! the store can be exercised deterministically:
//!
//! - **Delayed listing visibility**: new objects stay out of listings, and
//!   deleted objects stay in them, for a configurable window
//! - **Throttling**: calls fail with a retryable `Throttled` error, up to a
//!   failure budget
//!
//! ## Architecture
//!
//! ```text
//! caller → InconsistentObjectStore → FailureInjector (may reject)
//!                 │                         │
//!                 ▼                         ▼
//!          underlying store ──raw listing──► ListingTransformer ◄── ConsistencyState
//!                 │
//!                 └── put/delete succeeded ──► ConsistencyState
//! ```
//!
//! State is registered only after the underlying call succeeds, so a
//! rejected or failed call never leaves delay state behind.

pub mod config;
pub mod dst;
pub mod failure;
pub mod listing;
pub mod state;
pub mod store;

use parking_lot::Mutex;
use std::sync::Arc;

/// RNG shared by the failure injector and the delay state
pub type SharedRng<R> = Arc<Mutex<R>>;

pub use config::{ConfigError, InconsistencyConfig, DEFAULT_DELAY_KEY_SUBSTRING, MATCH_ALL_KEYS};
pub use dst::{
    run_inconsistency_batch, summarize_inconsistency_batch, InconsistencyDSTConfig,
    InconsistencyDSTHarness, InconsistencyDSTResult, InconsistencyOp,
};
pub use failure::FailureInjector;
pub use listing::{is_descendant, rollup_prefix, ListingTransformer, TransformedListing};
pub use state::{ConsistencyState, DelayedDelete};
pub use store::{InconsistencyStats, InconsistentObjectStore};

//! Time-windowed delay state.
//!
//! Two maps, each behind its own short-lived lock:
//! - delayed puts: key -> time of the put, hidden from listings until the
//!   window has elapsed
//! - delayed deletes: key -> time of the delete plus the object's last known
//!   summary, re-surfaced in listings until the window has elapsed
//!
//! Lock scopes never span a call into the underlying store.

use super::config::InconsistencyConfig;
use super::SharedRng;
use crate::clock::{StoreClock, Timestamp};
use crate::io::Rng;
use crate::store::ObjectSummary;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// A recently deleted key that listings should keep reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedDelete {
    pub deleted_at: Timestamp,
    /// `None` when the delete targeted a prefix rather than an object
    pub summary: Option<ObjectSummary>,
}

pub struct ConsistencyState<R: Rng, C: StoreClock> {
    delay_key_substring: String,
    delay_key_probability: f64,
    delay_window: Duration,
    rng: SharedRng<R>,
    clock: C,
    delayed_puts: Mutex<HashMap<String, Timestamp>>,
    delayed_deletes: Mutex<HashMap<String, DelayedDelete>>,
}

impl<R: Rng, C: StoreClock> ConsistencyState<R, C> {
    /// `config` is expected to have been validated
    pub fn new(config: &InconsistencyConfig, rng: SharedRng<R>, clock: C) -> Self {
        ConsistencyState {
            delay_key_substring: config.delay_key_substring.clone(),
            delay_key_probability: config.delay_key_probability,
            delay_window: config.delay_window(),
            rng,
            clock,
            delayed_puts: Mutex::new(HashMap::new()),
            delayed_deletes: Mutex::new(HashMap::new()),
        }
    }

    /// Key matches the configured substring
    pub fn is_delay_eligible(&self, key: &str) -> bool {
        key.contains(self.delay_key_substring.as_str())
    }

    /// Eligibility plus one probability draw; call once per put/delete
    pub fn should_delay(&self, key: &str) -> bool {
        let delay =
            self.is_delay_eligible(key) && self.rng.lock().gen_bool(self.delay_key_probability);
        debug!("{} -> delay {}", key, delay);
        delay
    }

    /// Gate and record a put; returns whether it was delayed
    pub fn register_put(&self, key: &str) -> bool {
        let delay = self.should_delay(key);
        if delay {
            self.record_put(key);
        }
        delay
    }

    /// Record a put whose delay decision has already been made
    pub fn record_put(&self, key: &str) {
        debug!("delaying put of {}", key);
        let now = self.clock.now();
        self.delayed_puts.lock().insert(key.to_string(), now);
    }

    /// Gate and record a delete; returns whether it was delayed
    pub fn register_delete(&self, key: &str, summary: Option<ObjectSummary>) -> bool {
        let delay = self.should_delay(key);
        if delay {
            self.record_delete(key, summary);
        }
        delay
    }

    /// Record a delete whose delay decision has already been made
    pub fn record_delete(&self, key: &str, summary: Option<ObjectSummary>) {
        debug!(
            "delaying delete of {} (summary captured: {})",
            key,
            summary.is_some()
        );
        let deleted_at = self.clock.now();
        self.delayed_deletes
            .lock()
            .insert(key.to_string(), DelayedDelete { deleted_at, summary });
    }

    /// True while a put of `key` is inside its window.
    ///
    /// Expired put entries are left in place; only `clear` removes them.
    pub fn is_hidden_by_put(&self, key: &str) -> bool {
        let put_at = match self.delayed_puts.lock().get(key) {
            Some(ts) => *ts,
            None => return false,
        };
        !self.clock.has_elapsed(put_at, self.delay_window)
    }

    /// Deletes still inside their window. Expired entries are purged as the
    /// map is scanned.
    pub fn active_deletes(&self) -> Vec<(String, Option<ObjectSummary>)> {
        let mut deletes = self.delayed_deletes.lock();
        let mut active = Vec::with_capacity(deletes.len());
        deletes.retain(|key, delete| {
            if self.clock.has_elapsed(delete.deleted_at, self.delay_window) {
                debug!("no longer delaying delete of {}", key);
                false
            } else {
                active.push((key.clone(), delete.summary.clone()));
                true
            }
        });
        active
    }

    /// Drop all delay state
    pub fn clear(&self) {
        self.delayed_puts.lock().clear();
        self.delayed_deletes.lock().clear();
    }

    /// Put entries currently held, expired or not
    pub fn pending_puts(&self) -> usize {
        self.delayed_puts.lock().len()
    }

    /// Delete entries currently held; expired ones remain until the next scan
    pub fn pending_deletes(&self) -> usize {
        self.delayed_deletes.lock().len()
    }

    pub fn delay_key_substring(&self) -> &str {
        &self.delay_key_substring
    }

    pub fn delay_key_probability(&self) -> f64 {
        self.delay_key_probability
    }

    pub fn delay_window(&self) -> Duration {
        self.delay_window
    }
}

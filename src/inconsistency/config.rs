//! Configuration for the inconsistency layer
//!
//! Loaded from a TOML file, from `FAILINJECT_*` environment variables, or
//! built in code. Probabilities are validated eagerly so a bad value fails at
//! setup, never on a storage call.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Keys containing this substring are subject to delayed visibility by default
pub const DEFAULT_DELAY_KEY_SUBSTRING: &str = "DELAY_LISTING_ME";

/// Default delay window (5 seconds)
pub const DEFAULT_DELAY_KEY_MSEC: u64 = 5_000;

pub const DEFAULT_DELAY_KEY_PROBABILITY: f64 = 1.0;

/// Substring value that matches every key
pub const MATCH_ALL_KEYS: &str = "*";

pub const ENV_KEY_SUBSTRING: &str = "FAILINJECT_INCONSISTENCY_KEY_SUBSTRING";
pub const ENV_DELAY_PROBABILITY: &str = "FAILINJECT_INCONSISTENCY_PROBABILITY";
pub const ENV_DELAY_MSEC: &str = "FAILINJECT_INCONSISTENCY_MSEC";
pub const ENV_THROTTLE_PROBABILITY: &str = "FAILINJECT_THROTTLE_PROBABILITY";
pub const ENV_FAILURE_LIMIT: &str = "FAILINJECT_FAILURE_LIMIT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("probability out of range 0 to 1: {name} = {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Simulation parameters for `InconsistentObjectStore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InconsistencyConfig {
    /// Keys containing this substring are delay-eligible; empty or `*` matches all
    pub delay_key_substring: String,
    /// Fraction of eligible puts/deletes whose listing visibility is delayed
    pub delay_key_probability: f64,
    /// How long a delayed put stays hidden, or a delayed delete stays listed
    pub delay_key_msec: u64,
    /// Fraction of calls failed with an injected throttle
    pub throttle_probability: f64,
    /// Maximum injected failures before every call passes; 0 means no limit
    pub failure_limit: u64,
}

impl Default for InconsistencyConfig {
    fn default() -> Self {
        InconsistencyConfig {
            delay_key_substring: DEFAULT_DELAY_KEY_SUBSTRING.to_string(),
            delay_key_probability: DEFAULT_DELAY_KEY_PROBABILITY,
            delay_key_msec: DEFAULT_DELAY_KEY_MSEC,
            throttle_probability: 0.0,
            failure_limit: 0,
        }
    }
}

impl InconsistencyConfig {
    /// Delay every key for `window`, no throttling
    pub fn delay_all(window: Duration) -> Self {
        InconsistencyConfig {
            delay_key_substring: String::new(),
            delay_key_msec: window.as_millis() as u64,
            ..Default::default()
        }
    }

    /// No delays, no throttling: a pure pass-through
    pub fn no_faults() -> Self {
        InconsistencyConfig {
            delay_key_probability: 0.0,
            throttle_probability: 0.0,
            ..Default::default()
        }
    }

    pub fn with_throttle(mut self, probability: f64, failure_limit: u64) -> Self {
        self.throttle_probability = probability;
        self.failure_limit = failure_limit;
        self
    }

    /// Parse from TOML; missing fields take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: InconsistencyConfig = toml::from_str(s)?;
        config.validated()
    }

    /// Load from `FAILINJECT_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = InconsistencyConfig::default();

        if let Ok(v) = std::env::var(ENV_KEY_SUBSTRING) {
            config.delay_key_substring = v;
        }
        if let Some(v) = env_parse(ENV_DELAY_PROBABILITY)? {
            config.delay_key_probability = v;
        }
        if let Some(v) = env_parse(ENV_DELAY_MSEC)? {
            config.delay_key_msec = v;
        }
        if let Some(v) = env_parse(ENV_THROTTLE_PROBABILITY)? {
            config.throttle_probability = v;
        }
        if let Some(v) = env_parse(ENV_FAILURE_LIMIT)? {
            config.failure_limit = v;
        }

        config.validated()
    }

    /// Check probabilities and normalize the match-all substring
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        valid_probability("delay_key_probability", self.delay_key_probability)?;
        valid_probability("throttle_probability", self.throttle_probability)?;
        if self.delay_key_substring == MATCH_ALL_KEYS {
            self.delay_key_substring.clear();
        }
        Ok(self)
    }

    pub fn delay_window(&self) -> Duration {
        Duration::from_millis(self.delay_key_msec)
    }
}

impl std::fmt::Display for InconsistencyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} msec delay, substring {:?}, delay probability {}; throttle probability {}; failure limit {}",
            self.delay_key_msec,
            self.delay_key_substring,
            self.delay_key_probability,
            self.throttle_probability,
            self.failure_limit
        )
    }
}

/// Reject probabilities outside [0, 1], including NaN
pub fn valid_probability(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InconsistencyConfig::default();
        assert_eq!(config.delay_key_substring, "DELAY_LISTING_ME");
        assert_eq!(config.delay_key_msec, 5_000);
        assert!((config.delay_key_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.throttle_probability, 0.0);
        assert_eq!(config.failure_limit, 0);
    }

    #[test]
    fn test_match_all_normalized() {
        let config = InconsistencyConfig {
            delay_key_substring: "*".to_string(),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.delay_key_substring, "");
    }

    #[test]
    fn test_probability_out_of_range() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let err = InconsistencyConfig::default()
                .with_throttle(bad, 0)
                .validated()
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::ProbabilityOutOfRange {
                    name: "throttle_probability",
                    ..
                }
            ));
        }

        let err = InconsistencyConfig {
            delay_key_probability: 2.0,
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(err.to_string().contains("delay_key_probability"));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = InconsistencyConfig::from_toml_str(
            r#"
            delay_key_substring = "*"
            delay_key_msec = 250
            throttle_probability = 0.5
            failure_limit = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.delay_key_substring, "");
        assert_eq!(config.delay_window(), Duration::from_millis(250));
        assert_eq!(config.throttle_probability, 0.5);
        assert_eq!(config.failure_limit, 3);
        // Unset fields keep defaults
        assert_eq!(config.delay_key_probability, 1.0);
    }

    #[test]
    fn test_from_toml_rejects_bad_probability() {
        let err = InconsistencyConfig::from_toml_str("delay_key_probability = 1.01").unwrap_err();
        assert!(matches!(err, ConfigError::ProbabilityOutOfRange { .. }));

        let err = InconsistencyConfig::from_toml_str("delay_key_msec = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_KEY_SUBSTRING, "slow/");
        std::env::set_var(ENV_DELAY_MSEC, "1200");
        std::env::set_var(ENV_FAILURE_LIMIT, "7");
        let config = InconsistencyConfig::from_env().unwrap();
        assert_eq!(config.delay_key_substring, "slow/");
        assert_eq!(config.delay_key_msec, 1200);
        assert_eq!(config.failure_limit, 7);

        std::env::set_var(ENV_DELAY_MSEC, "soon");
        let err = InconsistencyConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_DELAY_MSEC, .. }));

        std::env::remove_var(ENV_KEY_SUBSTRING);
        std::env::remove_var(ENV_DELAY_MSEC);
        std::env::remove_var(ENV_FAILURE_LIMIT);
    }

    #[test]
    fn test_json_roundtrip_keeps_window() {
        let config = InconsistencyConfig::delay_all(Duration::from_millis(42));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: InconsistencyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.delay_window(), Duration::from_millis(42));
    }
}

//! Scheduler configuration
//!
//! Every field has a default, so an empty JSON object or an empty
//! environment yields a working configuration.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `SLOTGUARD_RETRY_MAX_ATTEMPTS` | `retry.max_attempts` | 3 |
//! | `SLOTGUARD_RETRY_BASE_DELAY_MS` | `retry.base_delay_ms` | 100 |
//! | `SLOTGUARD_RETRY_MAX_DELAY_MS` | `retry.max_delay_ms` | none |
//! | `SLOTGUARD_SLOT_MATCHING` | `slot_matching` | `exact` |
//! | `SLOTGUARD_AUDIT` | `audit_enabled` | true |

use serde::{Deserialize, Serialize};
use slotguard_concurrency::RetryPolicy;
use slotguard_core::{Result, SlotMatching};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SLOTGUARD_";

/// Retry settings in serializable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff base in milliseconds
    pub base_delay_ms: u64,
    /// Optional cap on any single backoff, in milliseconds
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: None,
        }
    }
}

impl RetryConfig {
    /// Convert to a validated [`RetryPolicy`]
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms));
        if let Some(cap) = self.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(cap));
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// Top-level scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Retry settings for version conflicts
    pub retry: RetryConfig,
    /// How time slots are compared when checking conflicts
    pub slot_matching: SlotMatching,
    /// Whether transactions and changes are written to the audit log
    pub audit_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            slot_matching: SlotMatching::Exact,
            audit_enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)?;
        config.retry.to_policy()?;
        Ok(config)
    }

    /// Read `SLOTGUARD_*` environment variables
    ///
    /// Unset variables keep their defaults. Unparsable values are logged and
    /// also keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |suffix: &str| {
            let key = format!("{}{}", ENV_PREFIX, suffix);
            lookup(&key).map(|value| (key, value))
        };

        if let Some(v) = read("RETRY_MAX_ATTEMPTS").and_then(|(k, v)| parse_or_warn::<u32>(&k, &v)) {
            if v >= 1 {
                config.retry.max_attempts = v;
            } else {
                warn!(value = v, "SLOTGUARD_RETRY_MAX_ATTEMPTS must be at least 1, using default");
            }
        }
        if let Some(v) = read("RETRY_BASE_DELAY_MS").and_then(|(k, v)| parse_or_warn(&k, &v)) {
            config.retry.base_delay_ms = v;
        }
        if let Some(v) = read("RETRY_MAX_DELAY_MS").and_then(|(k, v)| parse_or_warn(&k, &v)) {
            config.retry.max_delay_ms = Some(v);
        }
        if let Some((key, value)) = read("SLOT_MATCHING") {
            match value.trim().to_ascii_lowercase().as_str() {
                "exact" => config.slot_matching = SlotMatching::Exact,
                "overlap" => config.slot_matching = SlotMatching::Overlap,
                _ => warn!(key = %key, value = %value, "Unknown slot matching mode, using default"),
            }
        }
        if let Some((key, value)) = read("AUDIT") {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.audit_enabled = true,
                "0" | "false" | "no" | "off" => config.audit_enabled = false,
                _ => warn!(key = %key, value = %value, "Invalid boolean, using default"),
            }
        }
        config
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key = %key, value = %value, "Invalid number, using default");
            None
        }
    }
}

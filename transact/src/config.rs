//! Tunables for payment requests.
//!
//! [`PaymentConfig`] holds the knobs that are not part of a single request's
//! identity: how often to poll, how many failed polls to tolerate, and the
//! defaults used when a caller does not specify expiry or confirmation
//! targets. It deserializes from the `[payment]` table of a client
//! configuration file; every field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time a payment request stays open, in seconds.
pub const DEFAULT_EXPIRATION_SECS: u64 = 600;

/// Default confirmation target for forward and refund transactions.
pub const DEFAULT_CONF_TARGET: u32 = 6;

/// Configuration shared by payment requests.
///
/// # Example
///
/// ```rust
/// use transact::config::PaymentConfig;
///
/// let config: PaymentConfig = serde_json::from_str(r#"{ "poll_interval_ms": 250 }"#).unwrap();
/// assert_eq!(config.poll_interval().as_millis(), 250);
/// assert_eq!(config.expiration_secs, 600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Seconds a request stays open when the caller does not say otherwise.
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,

    /// Confirmations required when the caller does not say otherwise.
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    /// Delay between two balance polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive failed polls tolerated before the request is aborted.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,

    /// Confirmation target attached to forward and refund sends.
    #[serde(default = "default_conf_target")]
    pub conf_target: u32,
}

const fn default_expiration_secs() -> u64 {
    DEFAULT_EXPIRATION_SECS
}

const fn default_confirmations() -> u32 {
    1
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_max_poll_failures() -> u32 {
    3
}

const fn default_conf_target() -> u32 {
    DEFAULT_CONF_TARGET
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            expiration_secs: default_expiration_secs(),
            confirmations: default_confirmations(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_failures: default_max_poll_failures(),
            conf_target: default_conf_target(),
        }
    }
}

impl PaymentConfig {
    /// Returns the poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the default expiration as a [`Duration`].
    #[must_use]
    pub const fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

//! Channel configuration.
//!
//! Timing knobs for the heartbeat and the reconnect debounce, plus an
//! optional initial target URL. Configuration can be built in code or loaded
//! from JSON using the camel-cased field names.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use resilient_ws::ChannelConfig;
//!
//! let config = ChannelConfig::new()
//!     .with_url("ws://127.0.0.1:9000/feed")
//!     .with_heartbeat_interval(Duration::from_secs(5))
//!     .with_reconnect_delay(Duration::from_millis(500));
//!
//! assert!(config.validate().is_ok());
//!
//! let parsed = ChannelConfig::from_json(r#"{"heartbeatIntervalMs": 1000}"#).unwrap();
//! assert_eq!(parsed.heartbeat_interval(), Duration::from_secs(1));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Delay between a heartbeat (re)start and the next probe.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 2_000;

/// Time allowed for a probe reply before the connection is declared dead.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 2_000;

/// Debounce window before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

// ============================================================================
// ChannelConfig
// ============================================================================

/// Configuration for a [`Channel`](crate::Channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    /// Target to connect to on the first `init` without an explicit URL.
    pub url: Option<String>,

    /// Probe interval in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Probe reply deadline in milliseconds.
    ///
    /// `None` disables forced reconnection on a missed reply; liveness loss
    /// is then only detected through transport close or error events.
    pub heartbeat_timeout_ms: Option<u64>,

    /// Reconnect debounce delay in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ChannelConfig {
    /// Creates a configuration with the default timings and no URL.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            url: None,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            heartbeat_timeout_ms: Some(DEFAULT_HEARTBEAT_TIMEOUT_MS),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] / [`Error::InvalidUrl`] if validation fails
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChannelConfig {
    /// Sets the initial target URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the heartbeat probe interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = duration_to_ms(interval);
        self
    }

    /// Sets the heartbeat reply deadline.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout_ms = Some(duration_to_ms(timeout));
        self
    }

    /// Disables forced reconnection on a missed heartbeat reply.
    #[inline]
    #[must_use]
    pub fn without_heartbeat_timeout(mut self) -> Self {
        self.heartbeat_timeout_ms = None;
        self
    }

    /// Sets the reconnect debounce delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = duration_to_ms(delay);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ChannelConfig {
    /// Heartbeat probe interval.
    #[inline]
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Heartbeat reply deadline, if enforced.
    #[inline]
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        self.heartbeat_timeout_ms.map(Duration::from_millis)
    }

    /// Reconnect debounce delay.
    #[inline]
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if any duration is zero
    /// - [`Error::InvalidUrl`] if the configured URL is not a `ws`/`wss` URL
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::config("heartbeatIntervalMs must be greater than zero"));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(Error::config("reconnectDelayMs must be greater than zero"));
        }
        if self.heartbeat_timeout_ms == Some(0) {
            return Err(Error::config("heartbeatTimeoutMs must be greater than zero"));
        }
        if let Some(url) = &self.url {
            parse_target(url)?;
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a channel target, accepting only `ws` and `wss` URLs.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if parsing fails or the scheme is wrong.
pub fn parse_target(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(Error::invalid_url(
            url,
            format!("scheme must be ws or wss, got {other}"),
        )),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

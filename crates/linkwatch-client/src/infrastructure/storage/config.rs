//! TOML-based configuration for the client.
//!
//! Stored as `client.toml` through [`linkwatch_core::config_store`].  A
//! missing file yields the defaults:
//!
//! ```toml
//! [client]
//! log_level = "info"
//!
//! [protocol]
//! discovery_secret = "TkFLRURfU05BS0U="
//! network_key = "F326A5C39CC08EC015AB90698C7E6F8C"
//!
//! [timing]
//! discovery_interval_ms = 3000
//! settle_delay_ms = 1500
//! heartbeat_interval_ms = 5000
//!
//! [radio]
//! port = 47800
//! ```

use std::time::Duration;

use linkwatch_core::config_store::{ConfigError, ConfigFile};
use linkwatch_core::ProtocolConfig;
use linkwatch_radio::RadioConfig;
use serde::{Deserialize, Serialize};

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub radio: RadioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Period between Discover broadcasts while unpaired.
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
    /// Pause between pairing and the first heartbeat.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_interval_ms() -> u64 {
    3000
}
fn default_settle_delay_ms() -> u64 {
    1500
}
fn default_heartbeat_interval_ms() -> u64 {
    5000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            discovery_interval_ms: default_discovery_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

/// The three delays the client runtime waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimings {
    pub discovery_interval: Duration,
    pub settle_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ClientTimings {
    fn default() -> Self {
        TimingConfig::default().timings()
    }
}

impl TimingConfig {
    pub fn timings(&self) -> ClientTimings {
        ClientTimings {
            discovery_interval: Duration::from_millis(self.discovery_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        }
    }
}

impl ConfigFile for AppConfig {
    const FILE_NAME: &'static str = "client.toml";

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.discovery_interval_ms == 0 {
            return Err(ConfigError::Invalid("timing.discovery_interval_ms must be non-zero".into()));
        }
        if self.timing.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid("timing.heartbeat_interval_ms must be non-zero".into()));
        }
        self.radio.validate().map_err(ConfigError::Invalid)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

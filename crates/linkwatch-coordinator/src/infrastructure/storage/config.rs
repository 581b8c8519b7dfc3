//! TOML-based configuration for the coordinator.
//!
//! [`AppConfig`] is stored as `coordinator.toml` in the platform config
//! directory; [`linkwatch_core::config_store`] resolves, reads and writes it.
//! A missing file yields the defaults.  Every field carries a serde default,
//! so a partial file only overrides what it names:
//!
//! ```toml
//! [coordinator]
//! log_level = "debug"
//! max_clients = 2
//!
//! [protocol]
//! discovery_secret = "TkFLRURfU05BS0U="
//! network_key = "F326A5C39CC08EC015AB90698C7E6F8C"
//!
//! [timing]
//! sweep_interval_ms = 5000
//! liveness_timeout_ms = 15000
//! upgrade_retry = "retry"
//!
//! [radio]
//! port = 47800
//! ```

use std::time::Duration;

use linkwatch_core::config_store::{ConfigError, ConfigFile};
use linkwatch_core::ProtocolConfig;
use linkwatch_radio::RadioConfig;
use serde::{Deserialize, Serialize};

use crate::application::protocol_core::{CoreSettings, UpgradeRetry};
use crate::application::registry::DEFAULT_CAPACITY;

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub radio: RadioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Registry capacity.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Period of the liveness sweep.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Silence after which a client is declared dead.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
    #[serde(default)]
    pub upgrade_retry: UpgradeRetry,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    DEFAULT_CAPACITY
}
fn default_sweep_interval_ms() -> u64 {
    5000
}
fn default_liveness_timeout_ms() -> u64 {
    15000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_clients: default_max_clients(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            upgrade_retry: UpgradeRetry::default(),
        }
    }
}

impl ConfigFile for AppConfig {
    const FILE_NAME: &'static str = "coordinator.toml";

    fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.max_clients == 0 {
            return Err(ConfigError::Invalid("coordinator.max_clients must be at least 1".into()));
        }
        if self.timing.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid("timing.sweep_interval_ms must be non-zero".into()));
        }
        if self.timing.liveness_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timing.liveness_timeout_ms must be non-zero".into()));
        }
        self.radio.validate().map_err(ConfigError::Invalid)
    }
}

impl AppConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.timing.sweep_interval_ms)
    }

    /// Settings for the application core.
    pub fn core_settings(&self) -> CoreSettings {
        CoreSettings {
            discovery_secret: self.protocol.discovery_secret.clone(),
            network_key: self.protocol.network_key.clone(),
            capacity: self.coordinator.max_clients,
            liveness_timeout: Duration::from_millis(self.timing.liveness_timeout_ms),
            upgrade_retry: self.timing.upgrade_retry,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! The coordinator's protocol state.
//!
//! [`ProtocolCore`] owns the device registry, the secure channel manager and
//! the settings that govern them.  It is the single shared mutable resource
//! of the coordinator: the inbound frame path (`handshake`), the liveness
//! sweep (`liveness`) and the operator console (`console`) all operate on it
//! through `&mut self`, and the runtime drives all three from one event loop.
//! No locking is needed because nothing else ever holds a reference.

use std::sync::Arc;
use std::time::Duration;

use linkwatch_core::{
    ChannelRole, Clock, DiscoverySecret, NetworkKey, RadioTransport, SecureChannelManager,
};
use serde::{Deserialize, Serialize};

use super::registry::{DeviceRegistry, DEFAULT_CAPACITY};

/// What to do after an encrypted upgrade fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeRetry {
    /// Try again on the next liveness sweep, or sooner if a plaintext
    /// heartbeat arrives first.
    #[default]
    #[serde(alias = "on_next_heartbeat")]
    Retry,
    /// Stay plaintext until the peer rediscovers.
    Never,
}

/// Tunables for a [`ProtocolCore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSettings {
    pub discovery_secret: DiscoverySecret,
    pub network_key: NetworkKey,
    pub capacity: usize,
    pub liveness_timeout: Duration,
    pub upgrade_retry: UpgradeRetry,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            discovery_secret: DiscoverySecret::default(),
            network_key: NetworkKey::default(),
            capacity: DEFAULT_CAPACITY,
            liveness_timeout: Duration::from_secs(15),
            upgrade_retry: UpgradeRetry::default(),
        }
    }
}

/// Registry, secure channels and settings for one coordinator.
pub struct ProtocolCore {
    pub(crate) registry: DeviceRegistry,
    pub(crate) channels: SecureChannelManager,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) discovery_secret: DiscoverySecret,
    pub(crate) liveness_timeout: Duration,
    pub(crate) upgrade_retry: UpgradeRetry,
}

impl ProtocolCore {
    pub fn new(settings: CoreSettings, transport: Arc<dyn RadioTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: DeviceRegistry::new(settings.capacity),
            channels: SecureChannelManager::new(transport, settings.network_key, ChannelRole::Coordinator),
            clock,
            discovery_secret: settings.discovery_secret,
            liveness_timeout: settings.liveness_timeout,
            upgrade_retry: settings.upgrade_retry,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn channels(&self) -> &SecureChannelManager {
        &self.channels
    }

    pub fn liveness_timeout(&self) -> Duration {
        self.liveness_timeout
    }
}

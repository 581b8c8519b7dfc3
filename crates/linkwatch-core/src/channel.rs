//! Secure channel manager.
//!
//! Owns, per peer address, whether traffic runs over a plaintext or an
//! encrypted relationship, and keeps the radio's peer table in step with that
//! view.  The lifecycle of one link is:
//!
//! ```text
//! Unauthenticated --establish_plain--> Plaintext --upgrade_to_encrypted--> Encrypted
//!        ^                                 |                                   |
//!        +------------- teardown ----------+-----------------------------------+
//! ```
//!
//! There is no downgrade from `Encrypted` to `Plaintext` short of a teardown
//! followed by a fresh `establish_plain`.
//!
//! The radio's peer table holds one relationship per address, so an upgrade
//! removes the plaintext entry before installing the keyed one.  If the keyed
//! install fails, the plaintext entry is put back and the link stays
//! `Plaintext`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::address::DeviceAddress;
use crate::domain::secrets::{LinkKey, NetworkKey};
use crate::protocol::frame::{encode_message, Message};
use crate::transport::{RadioTransport, TransportError};

/// Which side of the link this manager serves.
///
/// Link keys are derived from the client's address, so the coordinator keys
/// each link with the peer's address and a client with its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Coordinator,
    Client,
}

/// State of the relationship with one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unauthenticated,
    Plaintext,
    Encrypted,
}

/// Result of a successful [`SecureChannelManager::upgrade_to_encrypted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded,
    AlreadyEncrypted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The radio refused to hold the relationship.
    #[error("channel unavailable for {address}: {source}")]
    Unavailable {
        address: DeviceAddress,
        #[source]
        source: TransportError,
    },

    /// The operation needs an existing relationship and there is none.
    #[error("no relationship with {0}")]
    NotEstablished(DeviceAddress),

    /// The frame could not be handed to the radio.
    #[error("send to {address} failed: {source}")]
    SendFailed {
        address: DeviceAddress,
        #[source]
        source: TransportError,
    },
}

/// Per-peer link state on top of a [`RadioTransport`].
pub struct SecureChannelManager {
    transport: Arc<dyn RadioTransport>,
    network_key: NetworkKey,
    role: ChannelRole,
    links: HashMap<DeviceAddress, LinkState>,
}

impl SecureChannelManager {
    pub fn new(transport: Arc<dyn RadioTransport>, network_key: NetworkKey, role: ChannelRole) -> Self {
        Self {
            transport,
            network_key,
            role,
            links: HashMap::new(),
        }
    }

    pub fn local_address(&self) -> DeviceAddress {
        self.transport.local_address()
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Registers `address` for plaintext exchange.
    ///
    /// Any existing relationship with `address` is replaced, so a revived
    /// peer always starts again at the plaintext stage.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Unavailable`] if the radio's peer table is full.  The
    /// link is then `Unauthenticated`.
    pub fn establish_plain(&mut self, address: DeviceAddress) -> Result<(), ChannelError> {
        if self.links.remove(&address).is_some() {
            self.remove_from_radio(address);
        }

        self.transport
            .add_peer(address, None)
            .map_err(|source| ChannelError::Unavailable { address, source })?;
        self.links.insert(address, LinkState::Plaintext);
        debug!(peer = %address, "plaintext link established");
        Ok(())
    }

    /// Replaces the plaintext relationship with `address` by an encrypted one.
    ///
    /// Calling this on an already-encrypted link is a no-op that returns
    /// [`UpgradeOutcome::AlreadyEncrypted`].
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotEstablished`] if there is no relationship at all.
    /// - [`ChannelError::Unavailable`] if the radio refused the keyed peer.
    ///   The plaintext relationship is reinstalled when possible.
    pub fn upgrade_to_encrypted(&mut self, address: DeviceAddress) -> Result<UpgradeOutcome, ChannelError> {
        match self.link_state(address) {
            LinkState::Encrypted => return Ok(UpgradeOutcome::AlreadyEncrypted),
            LinkState::Unauthenticated => return Err(ChannelError::NotEstablished(address)),
            LinkState::Plaintext => {}
        }

        self.remove_from_radio(address);

        let key = self.link_key_for(address);
        if let Err(source) = self.transport.add_peer(address, Some(key)) {
            match self.transport.add_peer(address, None) {
                Ok(()) => {
                    warn!(peer = %address, "encrypted install failed; plaintext link restored");
                }
                Err(e) => {
                    warn!(peer = %address, error = %e, "encrypted install failed; link lost");
                    self.links.remove(&address);
                }
            }
            return Err(ChannelError::Unavailable { address, source });
        }

        self.links.insert(address, LinkState::Encrypted);
        info!(peer = %address, "link upgraded to encrypted");
        Ok(UpgradeOutcome::Upgraded)
    }

    /// Removes any relationship with `address`.  Idempotent.
    pub fn teardown(&mut self, address: DeviceAddress) {
        if self.links.remove(&address).is_some() {
            self.remove_from_radio(address);
            debug!(peer = %address, "link torn down");
        }
    }

    /// Sends `message` to a peer over its current relationship.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotEstablished`] for unknown peers, or
    /// [`ChannelError::SendFailed`] if the radio rejected the frame.
    pub fn send(&self, address: DeviceAddress, message: &Message) -> Result<(), ChannelError> {
        if !self.links.contains_key(&address) {
            return Err(ChannelError::NotEstablished(address));
        }
        self.transport
            .send(address, &encode_message(message))
            .map_err(|source| ChannelError::SendFailed { address, source })
    }

    /// Broadcasts `message` in plaintext to every listener.
    pub fn broadcast(&self, message: &Message) -> Result<(), ChannelError> {
        self.transport
            .broadcast(&encode_message(message))
            .map_err(|source| ChannelError::SendFailed {
                address: DeviceAddress::BROADCAST,
                source,
            })
    }

    pub fn link_state(&self, address: DeviceAddress) -> LinkState {
        self.links
            .get(&address)
            .copied()
            .unwrap_or(LinkState::Unauthenticated)
    }

    pub fn is_encrypted(&self, address: DeviceAddress) -> bool {
        self.link_state(address) == LinkState::Encrypted
    }

    fn link_key_for(&self, peer: DeviceAddress) -> LinkKey {
        let client = match self.role {
            ChannelRole::Coordinator => peer,
            ChannelRole::Client => self.transport.local_address(),
        };
        self.network_key.derive_link_key(client)
    }

    fn remove_from_radio(&self, address: DeviceAddress) {
        match self.transport.remove_peer(address) {
            Ok(()) | Err(TransportError::PeerNotFound(_)) => {}
            Err(e) => warn!(peer = %address, error = %e, "failed to remove peer from radio"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

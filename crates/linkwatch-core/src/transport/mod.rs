//! The radio transport seam.
//!
//! The protocol core never touches sockets.  It talks to the radio through
//! [`RadioTransport`], which mirrors what a connectionless broadcast radio
//! offers: fire-and-forget broadcast and unicast, and a bounded peer table in
//! which each address holds at most one relationship, optionally keyed.
//!
//! Inbound traffic does not arrive through a callback.  Implementations push
//! [`InboundFrame`] values into a channel consumed by the role's single event
//! loop, which serialises all state mutation.

pub mod mock;

use thiserror::Error;

use crate::domain::address::DeviceAddress;
use crate::domain::secrets::LinkKey;

/// One datagram received from the radio, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Hardware address of the sender.
    pub source: DeviceAddress,
    /// Raw frame bytes, already unsealed if the link is encrypted.
    pub bytes: Vec<u8>,
}

impl InboundFrame {
    pub fn new(source: DeviceAddress, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source,
            bytes: bytes.into(),
        }
    }
}

/// Errors reported by a [`RadioTransport`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No more relationships of the requested kind fit in the peer table.
    #[error("peer table full ({limit} entries)")]
    PeerTableFull { limit: usize },

    #[error("peer {0} is not registered")]
    PeerNotFound(DeviceAddress),

    /// The address already holds a relationship; remove it first.
    #[error("peer {0} is already registered")]
    PeerExists(DeviceAddress),

    /// The datagram could not be handed to the radio.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Operations the protocol core needs from the radio subsystem.
///
/// All sends are fire-and-forget: `Ok` means the frame was handed to the
/// radio, not that anyone received it.
pub trait RadioTransport: Send + Sync {
    /// The hardware address of this radio interface.
    fn local_address(&self) -> DeviceAddress;

    /// Sends `bytes` to every listener.
    fn broadcast(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Sends `bytes` to a registered peer, sealed if the peer has a key.
    fn send(&self, to: DeviceAddress, bytes: &[u8]) -> Result<(), TransportError>;

    /// Registers `addr`, keyed with `key` when present.
    ///
    /// Adding an address that is already registered is an error at the
    /// radio level; callers remove the old relationship first.
    fn add_peer(&self, addr: DeviceAddress, key: Option<LinkKey>) -> Result<(), TransportError>;

    fn remove_peer(&self, addr: DeviceAddress) -> Result<(), TransportError>;
}

//! The protocol error taxonomy.
//!
//! Every inbound path in both roles reports through [`ProtocolError`].  None of
//! these conditions is fatal: the event loop logs each one at its own level
//! and keeps running.  [`ProtocolError::severity`] tells the caller which
//! level to use, so the choice lives next to the taxonomy instead of being
//! repeated at every call site.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::domain::address::DeviceAddress;
use crate::protocol::frame::{FrameError, FrameType};

/// How loudly a [`ProtocolError`] should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Reported at `trace` only; carries no payload detail.
    Silent,
    Debug,
    Info,
    Warn,
    Error,
}

/// Every way an inbound frame or a dispatch attempt can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Wrong size, unknown type tag, or unknown command byte.
    #[error("malformed frame from {peer}: {reason}")]
    MalformedFrame {
        peer: DeviceAddress,
        #[source]
        reason: FrameError,
    },

    /// The discovery secret did not match.  Deliberately carries no payload.
    #[error("authentication failure from {peer}")]
    AuthenticationFailure { peer: DeviceAddress },

    /// Heartbeat or command from/to an address nobody is tracking.
    #[error("unknown peer {0}")]
    UnknownPeer(DeviceAddress),

    #[error("registry full ({capacity} slots); rejected {peer}")]
    RegistryFull { peer: DeviceAddress, capacity: usize },

    #[error("{0} is already paired and alive")]
    DuplicateAlivePeer(DeviceAddress),

    /// The transport could not hold the requested peer relationship.
    #[error("secure channel unavailable for {peer}")]
    ChannelUnavailable {
        peer: DeviceAddress,
        #[source]
        source: ChannelError,
    },

    /// This role received a frame type it only ever sends.
    #[error("unexpected {frame_type:?} frame from {peer}")]
    ProtocolAnomaly {
        peer: DeviceAddress,
        frame_type: FrameType,
    },
}

impl ProtocolError {
    /// The log level this condition is reported at.
    pub fn severity(&self) -> Severity {
        match self {
            ProtocolError::AuthenticationFailure { .. } => Severity::Silent,
            ProtocolError::MalformedFrame { .. } => Severity::Debug,
            ProtocolError::RegistryFull { .. } | ProtocolError::DuplicateAlivePeer(_) => {
                Severity::Info
            }
            ProtocolError::UnknownPeer(_) | ProtocolError::ProtocolAnomaly { .. } => {
                Severity::Warn
            }
            ProtocolError::ChannelUnavailable { .. } => Severity::Error,
        }
    }

    /// The address the error concerns.
    pub fn peer(&self) -> DeviceAddress {
        match self {
            ProtocolError::MalformedFrame { peer, .. }
            | ProtocolError::AuthenticationFailure { peer }
            | ProtocolError::RegistryFull { peer, .. }
            | ProtocolError::ChannelUnavailable { peer, .. }
            | ProtocolError::ProtocolAnomaly { peer, .. } => *peer,
            ProtocolError::UnknownPeer(peer) | ProtocolError::DuplicateAlivePeer(peer) => *peer,
        }
    }

    /// Emits this error through `tracing` at its [`Severity`].
    pub fn report(&self) {
        match self.severity() {
            Severity::Silent => tracing::trace!(peer = %self.peer(), "frame dropped"),
            Severity::Debug => tracing::debug!("{self}"),
            Severity::Info => tracing::info!("{self}"),
            Severity::Warn => tracing::warn!("{self}"),
            Severity::Error => tracing::error!("{self}"),
        }
    }
}

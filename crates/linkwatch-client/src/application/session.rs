//! Client side of the pairing handshake.
//!
//! # State machine
//!
//! ```text
//!                 tick: broadcast Discover
//!               ┌───────┐
//!               ▼       │
//!         ┌─────────────┴┐  Acknowledge(secret)   ┌────────┐
//!  ──────►│ Discovering  ├───────────────────────►│ Paired │
//!         └──────────────┘                        └───┬────┘
//!                ▲                                    │ tick (after settle delay)
//!                │ Reboot command                     ▼
//!                │                           ┌────────────────┐
//!                └───────────────────────────┤  Heartbeating  │◄─┐
//!                                            └───────┬────────┘  │
//!                                                    └───────────┘
//!                                              tick: send Heartbeat
//! ```
//!
//! The first heartbeat goes out over the plaintext link.  Right after it is
//! sent the client replaces that link with an encrypted one, mirroring what
//! the coordinator does when the heartbeat arrives.  This upgrade is
//! attempted exactly once per session, whatever the coordinator does.
//!
//! The session does not own any timers.  The runtime calls [`ClientSession::tick`]
//! after the delay that [`SessionPhase`] calls for.

use std::sync::Arc;

use linkwatch_core::{
    decode_message, ChannelError, ChannelRole, CommandKind, DeviceAddress, DiscoverySecret, FrameType,
    InboundFrame, Message, NetworkKey, ProtocolError, RadioTransport, SecureChannelManager,
};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::commands::{ActuatorError, CommandExecutor, CommandOutcome, DeviceActuator};

/// Where the session is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Discovering,
    Paired { coordinator: DeviceAddress },
    Heartbeating { coordinator: DeviceAddress, encrypted: bool },
}

/// [`SessionState`] without its data; selects the runtime's next delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Discovering,
    Paired,
    Heartbeating,
}

/// What a [`ClientSession::tick`] sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    DiscoverSent,
    /// `upgraded` is set on the tick that switched the link to encrypted.
    HeartbeatSent { upgraded: bool },
}

/// What an accepted inbound frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    Paired { coordinator: DeviceAddress },
    Executed(CommandOutcome),
    /// The frame was valid but needs no action (another client's Discover,
    /// or a repeated Acknowledge after pairing).
    Ignored,
}

/// Everything the client session can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{command} failed: {source}")]
    Actuator {
        command: CommandKind,
        #[source]
        source: ActuatorError,
    },

    #[error("radio send failed: {0}")]
    Send(#[from] ChannelError),
}

impl ClientError {
    /// Logs the error at the level it deserves.
    pub fn report(&self) {
        match self {
            ClientError::Protocol(e) => e.report(),
            ClientError::Actuator { .. } | ClientError::Send(_) => error!("{self}"),
        }
    }
}

/// The client's protocol state plus its channel to the coordinator.
pub struct ClientSession {
    state: SessionState,
    secret: DiscoverySecret,
    channels: SecureChannelManager,
    executor: CommandExecutor,
}

impl ClientSession {
    pub fn new(
        secret: DiscoverySecret,
        network_key: NetworkKey,
        transport: Arc<dyn RadioTransport>,
        actuator: Arc<dyn DeviceActuator>,
    ) -> Self {
        Self {
            state: SessionState::Discovering,
            secret,
            channels: SecureChannelManager::new(transport, network_key, ChannelRole::Client),
            executor: CommandExecutor::new(actuator),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Discovering => SessionPhase::Discovering,
            SessionState::Paired { .. } => SessionPhase::Paired,
            SessionState::Heartbeating { .. } => SessionPhase::Heartbeating,
        }
    }

    /// The coordinator address once paired.
    pub fn coordinator(&self) -> Option<DeviceAddress> {
        match self.state {
            SessionState::Discovering => None,
            SessionState::Paired { coordinator } | SessionState::Heartbeating { coordinator, .. } => {
                Some(coordinator)
            }
        }
    }

    pub fn channels(&self) -> &SecureChannelManager {
        &self.channels
    }

    /// Performs the periodic action of the current state.
    ///
    /// `Paired` moves to `Heartbeating` and sends the first heartbeat.
    ///
    /// # Errors
    ///
    /// [`ClientError::Send`] if the radio refused the frame.  The state
    /// still advances so the next tick retries with the same action.
    pub fn tick(&mut self) -> Result<TickAction, ClientError> {
        match self.state {
            SessionState::Discovering => {
                self.channels.broadcast(&Message::discover(&self.secret))?;
                debug!("sent discovery message");
                Ok(TickAction::DiscoverSent)
            }
            SessionState::Paired { coordinator } => {
                self.state = SessionState::Heartbeating {
                    coordinator,
                    encrypted: false,
                };
                self.heartbeat(coordinator, true)
            }
            SessionState::Heartbeating { coordinator, .. } => self.heartbeat(coordinator, false),
        }
    }

    fn heartbeat(&mut self, coordinator: DeviceAddress, first: bool) -> Result<TickAction, ClientError> {
        let sent = self.channels.send(coordinator, &Message::Heartbeat);
        if !first {
            sent?;
            trace!(peer = %coordinator, "sent heartbeat");
            return Ok(TickAction::HeartbeatSent { upgraded: false });
        }

        if let Err(e) = &sent {
            warn!(peer = %coordinator, "first heartbeat not sent: {e}");
        } else {
            info!(peer = %coordinator, "sent unencrypted heartbeat");
        }

        // One attempt only, whether or not the plaintext heartbeat went out.
        match self.channels.upgrade_to_encrypted(coordinator) {
            Ok(_) => {
                self.state = SessionState::Heartbeating {
                    coordinator,
                    encrypted: true,
                };
                sent?;
                Ok(TickAction::HeartbeatSent { upgraded: true })
            }
            Err(source) => Err(ProtocolError::ChannelUnavailable {
                peer: coordinator,
                source,
            }
            .into()),
        }
    }

    /// Processes one frame delivered by the radio.
    ///
    /// # Errors
    ///
    /// Rejections are [`ClientError::Protocol`]; a failed device effect is
    /// [`ClientError::Actuator`].  None of them should stop the caller's loop.
    pub fn handle_inbound(&mut self, frame: &InboundFrame) -> Result<ClientAction, ClientError> {
        let peer = frame.source;
        let message = decode_message(&frame.bytes)
            .map_err(|reason| ProtocolError::MalformedFrame { peer, reason })?;

        match message {
            Message::Acknowledge { payload } => self.on_acknowledge(peer, &payload),
            Message::Command(command) => self.on_command(peer, command),
            // Other clients' discovery broadcasts reach us too.
            Message::Discover { .. } => Ok(ClientAction::Ignored),
            Message::Heartbeat => Err(ProtocolError::ProtocolAnomaly {
                peer,
                frame_type: FrameType::Heartbeat,
            }
            .into()),
        }
    }

    fn on_acknowledge(&mut self, peer: DeviceAddress, payload: &[u8]) -> Result<ClientAction, ClientError> {
        if !self.secret.matches(payload) {
            return Err(ProtocolError::AuthenticationFailure { peer }.into());
        }
        if self.state != SessionState::Discovering {
            debug!(peer = %peer, "acknowledgment while already paired");
            return Ok(ClientAction::Ignored);
        }

        self.channels
            .establish_plain(peer)
            .map_err(|source| ProtocolError::ChannelUnavailable { peer, source })?;
        self.state = SessionState::Paired { coordinator: peer };
        info!(peer = %peer, "acknowledgment received from coordinator");
        Ok(ClientAction::Paired { coordinator: peer })
    }

    fn on_command(&mut self, peer: DeviceAddress, command: CommandKind) -> Result<ClientAction, ClientError> {
        if self.coordinator() != Some(peer) {
            return Err(ProtocolError::UnknownPeer(peer).into());
        }

        let outcome = self
            .executor
            .execute(command)
            .map_err(|source| ClientError::Actuator { command, source })?;

        if outcome == CommandOutcome::Rebooting {
            self.reset();
        }
        Ok(ClientAction::Executed(outcome))
    }

    /// Drops the session and starts discovering again.
    pub fn reset(&mut self) {
        if let Some(coordinator) = self.coordinator() {
            self.channels.teardown(coordinator);
        }
        self.state = SessionState::Discovering;
        info!("session reset; discovering");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

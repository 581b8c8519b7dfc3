//! Coordinator side of the handshake.
//!
//! Per-peer states, tracked through the registry entry and the channel
//! manager rather than a separate state field:
//!
//! ```text
//! Unknown ──Discover(secret ok)──► Alive-Plain ──Heartbeat──► Alive-Encrypted
//!                                      ▲                          │
//!                                      └──── Discover ◄── Dead ◄──┘ (timeout / reboot)
//! ```
//!
//! Inbound handling by frame type:
//!
//! | Frame | Action |
//! |---|---|
//! | Discover | check secret, upsert registry, open plaintext link, reply Acknowledge |
//! | Heartbeat | upgrade link if still plaintext, record liveness |
//! | Acknowledge, Command | anomaly; the coordinator only ever sends these |
//!
//! A rejected Discover gets no reply.  The client keeps re-broadcasting on
//! its own interval, which is the only retry mechanism in the protocol.

use linkwatch_core::{
    decode_message, DeviceAddress, FrameType, InboundFrame, LinkState, Message, ProtocolError,
    UpgradeOutcome,
};
use tracing::{info, warn};

use super::protocol_core::{ProtocolCore, UpgradeRetry};
use super::registry::{DiscoveryOutcome, HeartbeatOutcome};

/// What an accepted inbound frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    /// A new client was paired and acknowledged.
    Paired { index: usize, address: DeviceAddress },
    /// A dead client rediscovered and was acknowledged.
    Revived { index: usize, address: DeviceAddress },
    /// A heartbeat was recorded; `upgraded` is set when it also promoted the link.
    HeartbeatRecorded { index: usize, upgraded: bool },
}

impl ProtocolCore {
    /// Processes one frame delivered by the radio.
    ///
    /// # Errors
    ///
    /// Every rejection is a [`ProtocolError`]; none of them should stop the
    /// caller's loop.
    pub fn handle_inbound(&mut self, frame: &InboundFrame) -> Result<InboundAction, ProtocolError> {
        let peer = frame.source;
        let message = decode_message(&frame.bytes)
            .map_err(|reason| ProtocolError::MalformedFrame { peer, reason })?;

        match message {
            Message::Discover { payload } => self.on_discover(peer, &payload),
            Message::Heartbeat => self.on_heartbeat(peer),
            Message::Acknowledge { .. } => Err(ProtocolError::ProtocolAnomaly {
                peer,
                frame_type: FrameType::Acknowledge,
            }),
            Message::Command(_) => Err(ProtocolError::ProtocolAnomaly {
                peer,
                frame_type: FrameType::Command,
            }),
        }
    }

    fn on_discover(&mut self, peer: DeviceAddress, payload: &[u8]) -> Result<InboundAction, ProtocolError> {
        if !self.discovery_secret.matches(payload) {
            return Err(ProtocolError::AuthenticationFailure { peer });
        }

        let (index, action) = match self.registry.upsert_on_discovery(peer) {
            DiscoveryOutcome::Inserted { index } => {
                warn!(peer = %peer, index, "new client added");
                (index, InboundAction::Paired { index, address: peer })
            }
            DiscoveryOutcome::Revived { index } => {
                warn!(peer = %peer, index, "client revived");
                (index, InboundAction::Revived { index, address: peer })
            }
            DiscoveryOutcome::RejectedFull => {
                return Err(ProtocolError::RegistryFull {
                    peer,
                    capacity: self.registry.capacity(),
                })
            }
            DiscoveryOutcome::RejectedAlreadyAlive { .. } => {
                return Err(ProtocolError::DuplicateAlivePeer(peer))
            }
        };

        // On failure the entry is left dead so the next Discover revives it.
        let reply = Message::acknowledge(&self.discovery_secret);
        let result = self
            .channels
            .establish_plain(peer)
            .and_then(|()| self.channels.send(peer, &reply));
        if let Err(source) = result {
            self.registry.mark_dead(index);
            self.channels.teardown(peer);
            return Err(ProtocolError::ChannelUnavailable { peer, source });
        }

        info!(peer = %peer, "sent acknowledgment");
        Ok(action)
    }

    fn on_heartbeat(&mut self, peer: DeviceAddress) -> Result<InboundAction, ProtocolError> {
        let index = self.registry.index_of(peer).ok_or(ProtocolError::UnknownPeer(peer))?;
        let entry = self.registry.entries()[index].clone();

        let wants_upgrade = !entry.encrypted
            && !(entry.upgrade_blocked && self.upgrade_retry == UpgradeRetry::Never);

        let mut upgraded = false;
        let mut failure = None;
        if wants_upgrade {
            match self.upgrade(peer) {
                Ok(_) => {
                    self.registry.set_encrypted(index);
                    upgraded = true;
                }
                Err(source) => {
                    match self.upgrade_retry {
                        UpgradeRetry::Never => self.registry.block_upgrade(index),
                        UpgradeRetry::Retry => self.registry.defer_upgrade(index),
                    }
                    failure = Some(source);
                }
            }
        }

        let now = self.clock.now();
        if let HeartbeatOutcome::UnknownPeer = self.registry.mark_heartbeat(peer, now) {
            return Err(ProtocolError::UnknownPeer(peer));
        }

        match failure {
            Some(source) => Err(ProtocolError::ChannelUnavailable { peer, source }),
            None => Ok(InboundAction::HeartbeatRecorded { index, upgraded }),
        }
    }

    /// Re-attempts every deferred upgrade.
    ///
    /// Once the client has keyed its side, its heartbeats are sealed and the
    /// radio drops them until this side is keyed too, so the retry cannot wait
    /// for a heartbeat.  Returns the indices that were upgraded.
    pub fn retry_pending_upgrades(&mut self) -> Vec<usize> {
        let mut upgraded = Vec::new();
        for (index, peer) in self.registry.pending_upgrades() {
            match self.upgrade(peer) {
                Ok(_) => {
                    self.registry.set_encrypted(index);
                    info!(peer = %peer, index, "deferred upgrade succeeded");
                    upgraded.push(index);
                }
                Err(source) => ProtocolError::ChannelUnavailable { peer, source }.report(),
            }
        }
        upgraded
    }

    /// Promotes the link with `peer`, first re-opening a plaintext link if a
    /// reboot dispatch had torn it down.
    fn upgrade(&mut self, peer: DeviceAddress) -> Result<UpgradeOutcome, linkwatch_core::ChannelError> {
        if self.channels.link_state(peer) == LinkState::Unauthenticated {
            self.channels.establish_plain(peer)?;
        }
        self.channels.upgrade_to_encrypted(peer)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::protocol_core::CoreSettings;
    use crate::application::test_support::{
        client, discover_from, fixture, fixture_with, heartbeat_from,
    };
    use linkwatch_core::transport::mock::PeerOp;
    use linkwatch_core::{encode_message, Clock, DiscoverySecret, FrameError};

    #[test]
    fn test_discover_with_matching_secret_pairs_and_acknowledges() {
        // Arrange
        let (radio, _clock, mut core) = fixture();

        // Act
        let action = core.handle_inbound(&discover_from(client(1))).unwrap();

        // Assert
        assert_eq!(action, InboundAction::Paired { index: 0, address: client(1) });
        assert_eq!(
            radio.sent_messages(),
            vec![(client(1), Message::acknowledge(&DiscoverySecret::default()))]
        );
        assert_eq!(core.channels().link_state(client(1)), LinkState::Plaintext);
    }

    #[test]
    fn test_discover_with_wrong_secret_is_silently_dropped() {
        let (radio, _clock, mut core) = fixture();
        let wrong = DiscoverySecret::new("TkFLRURfU05BS0U!").unwrap();
        let frame = InboundFrame::new(client(1), encode_message(&Message::discover(&wrong)));

        let result = core.handle_inbound(&frame);

        assert_eq!(result, Err(ProtocolError::AuthenticationFailure { peer: client(1) }));
        assert!(core.registry().is_empty());
        assert!(radio.sends().is_empty());
        assert!(radio.peer_ops().is_empty());
    }

    #[test]
    fn test_discover_beyond_capacity_gets_no_reply() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        core.handle_inbound(&discover_from(client(2))).unwrap();
        radio.clear_records();

        let result = core.handle_inbound(&discover_from(client(3)));

        assert_eq!(
            result,
            Err(ProtocolError::RegistryFull {
                peer: client(3),
                capacity: 2
            })
        );
        assert!(radio.sends().is_empty());
    }

    #[test]
    fn test_repeated_discover_from_alive_client_is_rejected() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.clear_records();

        assert_eq!(
            core.handle_inbound(&discover_from(client(1))),
            Err(ProtocolError::DuplicateAlivePeer(client(1)))
        );
        assert!(radio.sends().is_empty());
    }

    #[test]
    fn test_first_heartbeat_upgrades_then_records() {
        // Arrange
        let (radio, clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.clear_records();

        // Act
        let action = core.handle_inbound(&heartbeat_from(client(1))).unwrap();

        // Assert
        assert_eq!(action, InboundAction::HeartbeatRecorded { index: 0, upgraded: true });
        let entry = &core.registry().entries()[0];
        assert!(entry.encrypted);
        assert_eq!(entry.last_seen, Some(clock.now()));
        assert_eq!(
            radio.peer_ops(),
            vec![
                PeerOp::Removed(client(1)),
                PeerOp::Added { addr: client(1), keyed: true }
            ]
        );
    }

    #[test]
    fn test_later_heartbeats_do_not_upgrade_again() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        core.handle_inbound(&heartbeat_from(client(1))).unwrap();
        radio.clear_records();

        let action = core.handle_inbound(&heartbeat_from(client(1))).unwrap();

        assert_eq!(action, InboundAction::HeartbeatRecorded { index: 0, upgraded: false });
        assert!(radio.peer_ops().is_empty());
    }

    #[test]
    fn test_heartbeat_from_unknown_peer_never_registers() {
        let (_radio, _clock, mut core) = fixture();
        assert_eq!(
            core.handle_inbound(&heartbeat_from(client(7))),
            Err(ProtocolError::UnknownPeer(client(7)))
        );
        assert!(core.registry().is_empty());
    }

    #[test]
    fn test_acknowledge_and_command_are_anomalies() {
        let (_radio, _clock, mut core) = fixture();
        let ack = InboundFrame::new(
            client(1),
            encode_message(&Message::acknowledge(&DiscoverySecret::default())),
        );
        let cmd = InboundFrame::new(
            client(1),
            encode_message(&Message::Command(linkwatch_core::CommandKind::Reboot)),
        );

        assert!(matches!(
            core.handle_inbound(&ack),
            Err(ProtocolError::ProtocolAnomaly { frame_type: FrameType::Acknowledge, .. })
        ));
        assert!(matches!(
            core.handle_inbound(&cmd),
            Err(ProtocolError::ProtocolAnomaly { frame_type: FrameType::Command, .. })
        ));
        assert!(core.registry().is_empty());
    }

    #[test]
    fn test_wrong_size_frame_is_malformed_and_changes_nothing() {
        let (radio, _clock, mut core) = fixture();
        let frame = InboundFrame::new(client(1), vec![0u8; 63]);

        let result = core.handle_inbound(&frame);

        assert_eq!(
            result,
            Err(ProtocolError::MalformedFrame {
                peer: client(1),
                reason: FrameError::SizeMismatch { expected: 64, actual: 63 }
            })
        );
        assert!(core.registry().is_empty());
        assert!(radio.peer_ops().is_empty());
    }

    #[test]
    fn test_failed_upgrade_retries_on_next_plaintext_heartbeat_by_default() {
        // Arrange
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.set_fail_keyed_peers(true);

        // Act: first heartbeat fails to upgrade but is still recorded
        let first = core.handle_inbound(&heartbeat_from(client(1)));
        radio.set_fail_keyed_peers(false);
        let second = core.handle_inbound(&heartbeat_from(client(1))).unwrap();

        // Assert
        assert!(matches!(first, Err(ProtocolError::ChannelUnavailable { .. })));
        assert_eq!(second, InboundAction::HeartbeatRecorded { index: 0, upgraded: true });
        assert!(core.registry().entries()[0].encrypted);
    }

    #[test]
    fn test_failed_upgrade_is_not_retried_under_never_policy() {
        let settings = CoreSettings {
            upgrade_retry: UpgradeRetry::Never,
            ..CoreSettings::default()
        };
        let (radio, _clock, mut core) = fixture_with(settings);
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.set_fail_keyed_peers(true);
        let _ = core.handle_inbound(&heartbeat_from(client(1)));
        radio.set_fail_keyed_peers(false);

        let action = core.handle_inbound(&heartbeat_from(client(1))).unwrap();

        assert_eq!(action, InboundAction::HeartbeatRecorded { index: 0, upgraded: false });
        let entry = &core.registry().entries()[0];
        assert!(!entry.encrypted);
        assert!(entry.last_seen.is_some());
        assert_eq!(core.channels().link_state(client(1)), LinkState::Plaintext);
    }

    #[test]
    fn test_unanswerable_discover_leaves_entry_revivable() {
        let (radio, _clock, mut core) = fixture();
        radio.set_fail_sends(true);

        let result = core.handle_inbound(&discover_from(client(1)));
        radio.set_fail_sends(false);

        assert!(matches!(result, Err(ProtocolError::ChannelUnavailable { .. })));
        assert!(!core.registry().entries()[0].alive);
        assert_eq!(
            core.handle_inbound(&discover_from(client(1))).unwrap(),
            InboundAction::Revived { index: 0, address: client(1) }
        );
    }

    #[test]
    fn test_deferred_upgrade_is_retried_without_a_heartbeat() {
        // Arrange
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.set_fail_keyed_peers(true);
        let _ = core.handle_inbound(&heartbeat_from(client(1)));
        assert!(core.registry().entries()[0].upgrade_pending);

        // Act: a retry while the radio still refuses keys changes nothing
        assert!(core.retry_pending_upgrades().is_empty());
        radio.set_fail_keyed_peers(false);
        let upgraded = core.retry_pending_upgrades();

        // Assert
        assert_eq!(upgraded, vec![0]);
        let entry = &core.registry().entries()[0];
        assert!(entry.encrypted);
        assert!(!entry.upgrade_pending);
        assert!(radio.peer(client(1)).flatten().is_some());
        assert!(core.retry_pending_upgrades().is_empty());
    }

    #[test]
    fn test_never_policy_leaves_nothing_to_retry() {
        let settings = CoreSettings {
            upgrade_retry: UpgradeRetry::Never,
            ..CoreSettings::default()
        };
        let (radio, _clock, mut core) = fixture_with(settings);
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.set_fail_keyed_peers(true);
        let _ = core.handle_inbound(&heartbeat_from(client(1)));
        radio.set_fail_keyed_peers(false);

        assert!(core.retry_pending_upgrades().is_empty());
        assert!(!core.registry().entries()[0].encrypted);
    }
}

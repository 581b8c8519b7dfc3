//! Client and coordinator driven against each other.
//!
//! Each side talks to its own `RecordingRadio`; the test carries recorded
//! traffic across by hand, which keeps every step observable.

use std::sync::Arc;
use std::time::Duration;

use linkwatch_client::application::commands::CommandOutcome;
use linkwatch_client::application::session::{ClientAction, ClientSession, SessionState, TickAction};
use linkwatch_client::infrastructure::actuator::RecordingActuator;
use linkwatch_coordinator::application::console::ConsoleCommand;
use linkwatch_coordinator::application::protocol_core::{CoreSettings, ProtocolCore};
use linkwatch_core::transport::mock::RecordingRadio;
use linkwatch_core::{DeviceAddress, DiscoverySecret, InboundFrame, ManualClock, NetworkKey};

fn coordinator_address() -> DeviceAddress {
    DeviceAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0xC0])
}

fn client_address() -> DeviceAddress {
    DeviceAddress::new([0x30, 0xAE, 0xA4, 0x00, 0x00, 0x01])
}

struct Segment {
    coordinator_radio: Arc<RecordingRadio>,
    client_radio: Arc<RecordingRadio>,
    clock: Arc<ManualClock>,
    core: ProtocolCore,
    session: ClientSession,
    actuator: Arc<RecordingActuator>,
}

impl Segment {
    fn new(client_secret: &str) -> Self {
        let coordinator_radio = Arc::new(RecordingRadio::new(coordinator_address()));
        let client_radio = Arc::new(RecordingRadio::new(client_address()));
        let clock = Arc::new(ManualClock::new());
        let actuator = Arc::new(RecordingActuator::new());
        let core = ProtocolCore::new(CoreSettings::default(), coordinator_radio.clone(), clock.clone());
        let session = ClientSession::new(
            DiscoverySecret::new(client_secret).unwrap(),
            NetworkKey::default(),
            client_radio.clone(),
            actuator.clone(),
        );
        Self {
            coordinator_radio,
            client_radio,
            clock,
            core,
            session,
            actuator,
        }
    }

    /// Delivers everything the client sent to the coordinator.
    fn client_to_coordinator(&mut self) {
        let broadcasts = self.client_radio.broadcasts();
        let sends = self.client_radio.sends();
        self.client_radio.clear_records();
        for bytes in broadcasts {
            let _ = self.core.handle_inbound(&InboundFrame::new(client_address(), bytes));
        }
        for (to, bytes) in sends {
            assert_eq!(to, coordinator_address());
            let _ = self.core.handle_inbound(&InboundFrame::new(client_address(), bytes));
        }
    }

    /// Delivers everything the coordinator sent to the client.
    fn coordinator_to_client(&mut self) -> Vec<ClientAction> {
        let sends = self.coordinator_radio.sends();
        self.coordinator_radio.clear_records();
        sends
            .into_iter()
            .filter(|(to, _)| *to == client_address())
            .filter_map(|(_, bytes)| {
                self.session
                    .handle_inbound(&InboundFrame::new(coordinator_address(), bytes))
                    .ok()
            })
            .collect()
    }
}

#[test]
fn test_client_pairs_and_both_ends_agree_on_link_key() {
    // Arrange
    let mut seg = Segment::new("TkFLRURfU05BS0U=");

    // Act: discover, acknowledge, first heartbeat.
    assert_eq!(seg.session.tick().unwrap(), TickAction::DiscoverSent);
    seg.client_to_coordinator();
    let actions = seg.coordinator_to_client();
    assert_eq!(seg.session.tick().unwrap(), TickAction::HeartbeatSent { upgraded: true });
    seg.client_to_coordinator();

    // Assert
    assert_eq!(actions, vec![ClientAction::Paired { coordinator: coordinator_address() }]);
    let entry = &seg.core.registry().entries()[0];
    assert!(entry.alive && entry.encrypted);
    let coordinator_key = seg.coordinator_radio.peer(client_address()).flatten();
    let client_key = seg.client_radio.peer(coordinator_address()).flatten();
    assert!(coordinator_key.is_some());
    assert_eq!(coordinator_key, client_key);
}

#[test]
fn test_client_with_wrong_secret_never_pairs() {
    let mut seg = Segment::new("wrong-secret");

    for _ in 0..5 {
        seg.session.tick().unwrap();
        seg.client_to_coordinator();
        seg.coordinator_to_client();
    }

    assert!(seg.core.registry().is_empty());
    assert_eq!(seg.session.state(), SessionState::Discovering);
}

#[test]
fn test_led_command_reaches_client_actuator() {
    // Arrange
    let mut seg = Segment::new("TkFLRURfU05BS0U=");
    seg.session.tick().unwrap();
    seg.client_to_coordinator();
    seg.coordinator_to_client();
    seg.session.tick().unwrap();
    seg.client_to_coordinator();

    // Act
    seg.core.execute(ConsoleCommand::Led(0)).unwrap();
    let actions = seg.coordinator_to_client();

    // Assert
    assert_eq!(actions, vec![ClientAction::Executed(CommandOutcome::LedSwitched { on: true })]);
    assert_eq!(seg.actuator.led_toggles(), 1);
}

#[test]
fn test_reboot_then_rediscovery_revives_same_slot() {
    // Arrange
    let mut seg = Segment::new("TkFLRURfU05BS0U=");
    seg.session.tick().unwrap();
    seg.client_to_coordinator();
    seg.coordinator_to_client();
    seg.session.tick().unwrap();
    seg.client_to_coordinator();

    // Act: reboot, then let the client rediscover.
    seg.core.execute(ConsoleCommand::Reboot(0)).unwrap();
    seg.coordinator_to_client();
    assert_eq!(seg.session.state(), SessionState::Discovering);
    seg.session.tick().unwrap();
    seg.client_to_coordinator();
    seg.coordinator_to_client();
    seg.session.tick().unwrap();
    seg.client_to_coordinator();

    // Assert
    assert_eq!(seg.actuator.reboots(), 1);
    assert_eq!(seg.core.registry().len(), 1);
    let entry = &seg.core.registry().entries()[0];
    assert!(entry.alive && entry.encrypted);
    assert!(matches!(seg.session.state(), SessionState::Heartbeating { encrypted: true, .. }));
}

#[test]
fn test_client_that_stops_heartbeating_is_declared_dead() {
    let mut seg = Segment::new("TkFLRURfU05BS0U=");
    seg.session.tick().unwrap();
    seg.client_to_coordinator();
    seg.coordinator_to_client();
    seg.session.tick().unwrap();
    seg.client_to_coordinator();

    seg.clock.advance(Duration::from_secs(16));
    let lost = seg.core.sweep_liveness();

    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].address, client_address());
}

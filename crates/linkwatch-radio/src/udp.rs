//! UDP broadcast radio.
//!
//! Every node binds the same UDP port with address and port reuse enabled,
//! and every datagram, unicast included, is sent to the broadcast address.
//! The envelope's destination field does the addressing, as on a shared
//! radio channel where every receiver hears every transmission.
//!
//! The receive side runs on a dedicated thread with a short read timeout so
//! the blocking `recv_from` never stalls the Tokio runtime.  Accepted frames
//! are pushed into an mpsc channel with `blocking_send`; the role's event loop
//! consumes them.  The thread exits when [`UdpRadio::shutdown`] is called or
//! the receiver is dropped.

use std::io;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use linkwatch_core::{DeviceAddress, InboundFrame, LinkKey, RadioTransport, TransportError};
use rand::RngCore;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::config::RadioConfig;
use crate::crypto::{self, CryptoError};
use crate::envelope::{self, EnvelopeError, Header};
use crate::peers::PeerTable;

/// Depth of the inbound frame queue.
const INBOUND_QUEUE: usize = 64;

const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest datagram worth reading: header, nonce, frame and tag.
const MAX_DATAGRAM: usize = 512;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("invalid radio configuration: {0}")]
    Config(String),

    #[error("failed to bind radio socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    #[error("socket setup failed: {0}")]
    Socket(#[from] io::Error),
}

/// Why an inbound datagram was discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejected {
    #[error("own transmission")]
    FromSelf,

    #[error("addressed to {0}")]
    NotForUs(DeviceAddress),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("sealed frame from {0}, which has no link key")]
    NoKey(DeviceAddress),

    #[error("sealed frame from {peer} failed to open: {source}")]
    Unseal {
        peer: DeviceAddress,
        #[source]
        source: CryptoError,
    },

    #[error("plaintext unicast from encrypted peer {0}")]
    PlaintextFromEncryptedPeer(DeviceAddress),
}

/// A [`RadioTransport`] backed by a shared UDP broadcast port.
pub struct UdpRadio {
    socket: UdpSocket,
    local: DeviceAddress,
    target: SocketAddrV4,
    peers: Mutex<PeerTable>,
    running: AtomicBool,
}

impl UdpRadio {
    /// Binds the socket, starts the receive thread, and returns the radio
    /// together with the queue of accepted inbound frames.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError`] if the configuration is invalid or the socket
    /// cannot be set up.
    pub fn start(config: &RadioConfig) -> Result<(Arc<Self>, mpsc::Receiver<InboundFrame>), RadioError> {
        config.validate().map_err(RadioError::Config)?;

        let bind = SocketAddrV4::new(config.bind_address, config.port);
        let socket = bind_shared(bind)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;

        let local = config.local_address.unwrap_or_else(random_address);
        let radio = Arc::new(Self {
            socket,
            local,
            target: SocketAddrV4::new(config.broadcast_address, config.port),
            peers: Mutex::new(PeerTable::new(config.max_peers, config.max_encrypted_peers)),
            running: AtomicBool::new(true),
        });

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let worker = Arc::clone(&radio);
        std::thread::Builder::new()
            .name("linkwatch-radio-rx".to_string())
            .spawn(move || worker.receive_loop(tx))?;

        info!(local = %local, port = config.port, "radio listening");
        Ok((radio, rx))
    }

    /// Asks the receive thread to stop after its current read.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    fn receive_loop(&self, tx: mpsc::Sender<InboundFrame>) {
        let mut buf = [0u8; MAX_DATAGRAM];

        while self.running.load(Ordering::Relaxed) {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _)) => len,
                Err(e) if is_timeout_error(&e) => continue,
                Err(e) => {
                    error!("radio recv error: {e}");
                    continue;
                }
            };

            let accepted = accept(self.local, &self.peers(), &buf[..len]);
            match accepted {
                Ok(frame) => {
                    if tx.blocking_send(frame).is_err() {
                        break;
                    }
                }
                Err(Rejected::FromSelf) | Err(Rejected::NotForUs(_)) => {}
                Err(reason) => trace!("datagram dropped: {reason}"),
            }
        }

        info!("radio receive loop stopped");
    }

    fn transmit(&self, destination: DeviceAddress, frame: &[u8]) -> Result<(), TransportError> {
        let datagram = outbound(self.local, &self.peers(), destination, frame)?;
        self.socket
            .send_to(&datagram, SocketAddr::V4(self.target))
            .map(|_| ())
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn peers(&self) -> MutexGuard<'_, PeerTable> {
        self.peers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RadioTransport for UdpRadio {
    fn local_address(&self) -> DeviceAddress {
        self.local
    }

    fn broadcast(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transmit(DeviceAddress::BROADCAST, bytes)
    }

    fn send(&self, to: DeviceAddress, bytes: &[u8]) -> Result<(), TransportError> {
        self.transmit(to, bytes)
    }

    fn add_peer(&self, addr: DeviceAddress, key: Option<LinkKey>) -> Result<(), TransportError> {
        let mut peers = self.peers();
        if peers.get(addr).is_some() {
            return Err(TransportError::PeerExists(addr));
        }
        peers.add(addr, key)?;
        debug!(peer = %addr, keyed = key.is_some(), "peer added");
        Ok(())
    }

    fn remove_peer(&self, addr: DeviceAddress) -> Result<(), TransportError> {
        self.peers().remove(addr)?;
        debug!(peer = %addr, "peer removed");
        Ok(())
    }
}

/// Builds the datagram carrying `frame` from `local` to `destination`.
///
/// Broadcasts are always plaintext.  Unicast requires a registered peer and
/// is sealed when that peer holds a key.
pub fn outbound(
    local: DeviceAddress,
    peers: &PeerTable,
    destination: DeviceAddress,
    frame: &[u8],
) -> Result<Vec<u8>, TransportError> {
    if destination.is_broadcast() {
        let header = Header {
            source: local,
            destination,
            sealed: false,
        };
        return Ok(envelope::encode(&header, frame));
    }

    let key = peers
        .get(destination)
        .ok_or(TransportError::PeerNotFound(destination))?;
    let header = Header {
        source: local,
        destination,
        sealed: key.is_some(),
    };

    match key {
        Some(key) => {
            let aad = header.to_bytes();
            let body = crypto::seal(&key, &aad, frame)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            Ok(envelope::encode(&header, &body))
        }
        None => Ok(envelope::encode(&header, frame)),
    }
}

/// Applies the receive-side filter to one datagram.
pub fn accept(local: DeviceAddress, peers: &PeerTable, datagram: &[u8]) -> Result<InboundFrame, Rejected> {
    let (header, body) = envelope::decode(datagram)?;

    if header.source == local {
        return Err(Rejected::FromSelf);
    }
    if header.destination != local && !header.destination.is_broadcast() {
        return Err(Rejected::NotForUs(header.destination));
    }

    let peer_key = peers.get(header.source).flatten();

    if header.sealed {
        let key = peer_key.ok_or(Rejected::NoKey(header.source))?;
        let frame = crypto::open(&key, &header.to_bytes(), body).map_err(|source| Rejected::Unseal {
            peer: header.source,
            source,
        })?;
        return Ok(InboundFrame::new(header.source, frame));
    }

    if peer_key.is_some() && !header.destination.is_broadcast() {
        return Err(Rejected::PlaintextFromEncryptedPeer(header.source));
    }
    Ok(InboundFrame::new(header.source, body))
}

fn bind_shared(addr: SocketAddrV4) -> Result<UdpSocket, RadioError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_broadcast(true)?;
    socket
        .bind(&SocketAddr::V4(addr).into())
        .map_err(|source| RadioError::BindFailed { addr, source })?;
    Ok(socket.into())
}

fn random_address() -> DeviceAddress {
    let mut octets = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut octets);
    DeviceAddress::locally_administered(octets)
}

fn is_timeout_error(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> DeviceAddress {
        DeviceAddress::new([0x02, 0, 0, 0, 0, 0xC0])
    }

    fn client() -> DeviceAddress {
        DeviceAddress::new([0x02, 0, 0, 0, 0, 0x01])
    }

    fn other() -> DeviceAddress {
        DeviceAddress::new([0x02, 0, 0, 0, 0, 0x02])
    }

    fn key() -> LinkKey {
        LinkKey::from_bytes([0x5A; 16])
    }

    fn table(entries: &[(DeviceAddress, Option<LinkKey>)]) -> PeerTable {
        let mut t = PeerTable::new(20, 6);
        for (addr, k) in entries {
            t.add(*addr, *k).unwrap();
        }
        t
    }

    #[test]
    fn test_broadcast_from_stranger_is_accepted() {
        let wire = outbound(client(), &table(&[]), DeviceAddress::BROADCAST, &[1u8; 64]).unwrap();
        let frame = accept(coordinator(), &table(&[]), &wire).unwrap();
        assert_eq!(frame, InboundFrame::new(client(), vec![1u8; 64]));
    }

    #[test]
    fn test_own_transmission_is_dropped() {
        let wire = outbound(client(), &table(&[]), DeviceAddress::BROADCAST, &[0u8; 64]).unwrap();
        assert_eq!(accept(client(), &table(&[]), &wire), Err(Rejected::FromSelf));
    }

    #[test]
    fn test_unicast_for_someone_else_is_dropped() {
        let wire = outbound(coordinator(), &table(&[(other(), None)]), other(), &[0u8; 64]).unwrap();
        assert_eq!(
            accept(client(), &table(&[]), &wire),
            Err(Rejected::NotForUs(other()))
        );
    }

    #[test]
    fn test_unicast_to_unregistered_peer_fails() {
        assert_eq!(
            outbound(coordinator(), &table(&[]), client(), &[0u8; 64]),
            Err(TransportError::PeerNotFound(client()))
        );
    }

    #[test]
    fn test_sealed_unicast_round_trips_between_keyed_peers() {
        // Arrange
        let sender_peers = table(&[(client(), Some(key()))]);
        let receiver_peers = table(&[(coordinator(), Some(key()))]);

        // Act
        let wire = outbound(coordinator(), &sender_peers, client(), &[7u8; 64]).unwrap();
        let frame = accept(client(), &receiver_peers, &wire).unwrap();

        // Assert
        assert_ne!(&wire[envelope::HEADER_LEN..], &[7u8; 64][..]);
        assert_eq!(frame.bytes, vec![7u8; 64]);
    }

    #[test]
    fn test_sealed_frame_from_unkeyed_peer_is_dropped() {
        let wire = outbound(coordinator(), &table(&[(client(), Some(key()))]), client(), &[0u8; 64]).unwrap();
        assert_eq!(
            accept(client(), &table(&[(coordinator(), None)]), &wire),
            Err(Rejected::NoKey(coordinator()))
        );
    }

    #[test]
    fn test_sealed_frame_with_wrong_key_is_dropped() {
        let wire = outbound(coordinator(), &table(&[(client(), Some(key()))]), client(), &[0u8; 64]).unwrap();
        let wrong = table(&[(coordinator(), Some(LinkKey::from_bytes([1; 16])))]);
        assert!(matches!(
            accept(client(), &wrong, &wire),
            Err(Rejected::Unseal { .. })
        ));
    }

    #[test]
    fn test_plaintext_unicast_from_encrypted_peer_is_dropped() {
        let wire = outbound(coordinator(), &table(&[(client(), None)]), client(), &[0u8; 64]).unwrap();
        assert_eq!(
            accept(client(), &table(&[(coordinator(), Some(key()))]), &wire),
            Err(Rejected::PlaintextFromEncryptedPeer(coordinator()))
        );
    }

    #[test]
    fn test_plaintext_broadcast_from_encrypted_peer_is_accepted() {
        let wire = outbound(client(), &table(&[]), DeviceAddress::BROADCAST, &[0u8; 64]).unwrap();
        assert!(accept(coordinator(), &table(&[(client(), Some(key()))]), &wire).is_ok());
    }

    #[test]
    fn test_random_address_is_unicast_and_local() {
        let addr = random_address();
        assert!(!addr.is_broadcast());
        assert_eq!(addr.octets()[0] & 0x03, 0x02);
    }
}

//! In-memory radio for tests.
//!
//! [`RecordingRadio`] implements [`RadioTransport`] without sockets.  Every
//! broadcast, unicast send and peer-table change is pushed into a
//! `Mutex<Vec<...>>` so assertions can inspect exactly what the protocol
//! core did and in what order.
//!
//! The peer table enforces the same rules as the real radio: a bounded
//! number of entries, one relationship per address, and unicast only to
//! registered peers.  The `fail_*` flags simulate a radio that refuses work,
//! so error paths can be exercised without a broken socket.
//!
//! ```ignore
//! let radio = Arc::new(RecordingRadio::new(coordinator_addr()));
//! let mut channels = SecureChannelManager::new(radio.clone(), key, ChannelRole::Coordinator);
//!
//! channels.establish_plain(client)?;
//! assert_eq!(radio.peer_ops(), vec![PeerOp::Added { addr: client, keyed: false }]);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::address::DeviceAddress;
use crate::domain::secrets::LinkKey;
use crate::protocol::frame::{decode_message, Message};

use super::{RadioTransport, TransportError};

/// Default peer-table size, matching the real radio.
pub const DEFAULT_PEER_CAPACITY: usize = 20;

/// One change to the peer table, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOp {
    Added { addr: DeviceAddress, keyed: bool },
    Removed(DeviceAddress),
}

/// A radio that records instead of transmitting.
pub struct RecordingRadio {
    local: DeviceAddress,
    capacity: usize,
    peers: Mutex<HashMap<DeviceAddress, Option<LinkKey>>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
    sends: Mutex<Vec<(DeviceAddress, Vec<u8>)>>,
    peer_ops: Mutex<Vec<PeerOp>>,
    /// When set, `broadcast` and `send` return `SendFailed`.
    pub fail_sends: AtomicBool,
    /// When set, keyed `add_peer` calls return `PeerTableFull`.
    pub fail_keyed_peers: AtomicBool,
}

impl RecordingRadio {
    pub fn new(local: DeviceAddress) -> Self {
        Self::with_capacity(local, DEFAULT_PEER_CAPACITY)
    }

    pub fn with_capacity(local: DeviceAddress, capacity: usize) -> Self {
        Self {
            local,
            capacity,
            peers: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
            peer_ops: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            fail_keyed_peers: AtomicBool::new(false),
        }
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_keyed_peers(&self, fail: bool) {
        self.fail_keyed_peers.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes of every broadcast so far.
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        lock(&self.broadcasts).clone()
    }

    /// Raw `(destination, bytes)` of every unicast so far.
    pub fn sends(&self) -> Vec<(DeviceAddress, Vec<u8>)> {
        lock(&self.sends).clone()
    }

    /// Every unicast decoded back into a [`Message`]; undecodable sends are skipped.
    pub fn sent_messages(&self) -> Vec<(DeviceAddress, Message)> {
        lock(&self.sends)
            .iter()
            .filter_map(|(to, bytes)| decode_message(bytes).ok().map(|m| (*to, m)))
            .collect()
    }

    /// Every broadcast decoded back into a [`Message`].
    pub fn broadcast_messages(&self) -> Vec<Message> {
        lock(&self.broadcasts)
            .iter()
            .filter_map(|bytes| decode_message(bytes).ok())
            .collect()
    }

    pub fn peer_ops(&self) -> Vec<PeerOp> {
        lock(&self.peer_ops).clone()
    }

    /// `None` if `addr` is not registered, `Some(key)` otherwise.
    pub fn peer(&self, addr: DeviceAddress) -> Option<Option<LinkKey>> {
        lock(&self.peers).get(&addr).copied()
    }

    pub fn peer_count(&self) -> usize {
        lock(&self.peers).len()
    }

    /// Forgets recorded traffic and peer operations; the peer table is kept.
    pub fn clear_records(&self) {
        lock(&self.broadcasts).clear();
        lock(&self.sends).clear();
        lock(&self.peer_ops).clear();
    }
}

impl RadioTransport for RecordingRadio {
    fn local_address(&self) -> DeviceAddress {
        self.local
    }

    fn broadcast(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("simulated radio failure".into()));
        }
        lock(&self.broadcasts).push(bytes.to_vec());
        Ok(())
    }

    fn send(&self, to: DeviceAddress, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("simulated radio failure".into()));
        }
        if !lock(&self.peers).contains_key(&to) {
            return Err(TransportError::PeerNotFound(to));
        }
        lock(&self.sends).push((to, bytes.to_vec()));
        Ok(())
    }

    fn add_peer(&self, addr: DeviceAddress, key: Option<LinkKey>) -> Result<(), TransportError> {
        if key.is_some() && self.fail_keyed_peers.load(Ordering::SeqCst) {
            return Err(TransportError::PeerTableFull { limit: 0 });
        }
        let mut peers = lock(&self.peers);
        if peers.contains_key(&addr) {
            return Err(TransportError::PeerExists(addr));
        }
        if peers.len() >= self.capacity {
            return Err(TransportError::PeerTableFull {
                limit: self.capacity,
            });
        }
        peers.insert(addr, key);
        lock(&self.peer_ops).push(PeerOp::Added {
            addr,
            keyed: key.is_some(),
        });
        Ok(())
    }

    fn remove_peer(&self, addr: DeviceAddress) -> Result<(), TransportError> {
        if lock(&self.peers).remove(&addr).is_none() {
            return Err(TransportError::PeerNotFound(addr));
        }
        lock(&self.peer_ops).push(PeerOp::Removed(addr));
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

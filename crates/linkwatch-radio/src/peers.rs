//! Bounded peer table.
//!
//! Mirrors the radio's own table: at most `max_peers` entries, at most
//! `max_encrypted` of them keyed, and one relationship per address.

use std::collections::HashMap;

use linkwatch_core::{DeviceAddress, LinkKey, TransportError};

#[derive(Debug)]
pub struct PeerTable {
    max_peers: usize,
    max_encrypted: usize,
    entries: HashMap<DeviceAddress, Option<LinkKey>>,
}

impl PeerTable {
    pub fn new(max_peers: usize, max_encrypted: usize) -> Self {
        Self {
            max_peers,
            max_encrypted,
            entries: HashMap::new(),
        }
    }

    /// Registers `addr`, replacing any relationship it already had.
    pub fn add(&mut self, addr: DeviceAddress, key: Option<LinkKey>) -> Result<(), TransportError> {
        let existing = self.entries.get(&addr).copied();

        if existing.is_none() && self.entries.len() >= self.max_peers {
            return Err(TransportError::PeerTableFull {
                limit: self.max_peers,
            });
        }
        let already_keyed = matches!(existing, Some(Some(_)));
        if key.is_some() && !already_keyed && self.encrypted_count() >= self.max_encrypted {
            return Err(TransportError::PeerTableFull {
                limit: self.max_encrypted,
            });
        }

        self.entries.insert(addr, key);
        Ok(())
    }

    pub fn remove(&mut self, addr: DeviceAddress) -> Result<(), TransportError> {
        self.entries
            .remove(&addr)
            .map(|_| ())
            .ok_or(TransportError::PeerNotFound(addr))
    }

    /// `None` if unregistered, `Some(key)` otherwise.
    pub fn get(&self, addr: DeviceAddress) -> Option<Option<LinkKey>> {
        self.entries.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn encrypted_count(&self) -> usize {
        self.entries.values().filter(|k| k.is_some()).count()
    }
}

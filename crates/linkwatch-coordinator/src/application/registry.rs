//! Device registry: the coordinator's bounded table of known clients.
//!
//! Entries live in fixed slots addressed by index.  The index is what the
//! operator types at the console, so slots are never compacted or reused:
//! an entry, once created, keeps its index until the process exits.  Clients
//! that go silent are marked dead rather than removed, and a dead entry is
//! revived in place when the same address discovers again.
//!
//! # Entry lifecycle
//!
//! ```text
//!            Discover (slot free)
//!   (none) ───────────────────────►  alive, last_seen = None
//!                                        │
//!                                        │ Heartbeat
//!                                        ▼
//!                                    alive, last_seen = t
//!                                        │
//!                        silence > timeout │ or reboot dispatched
//!                                        ▼
//!                                      dead  ── Discover ──► alive, last_seen = None
//! ```
//!
//! An entry whose `last_seen` is still `None` has paired but not yet sent
//! its first heartbeat.  Sweeps skip it.

use std::time::{Duration, Instant};

use linkwatch_core::DeviceAddress;

/// Default number of client slots.
pub const DEFAULT_CAPACITY: usize = 2;

/// One known client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub address: DeviceAddress,
    /// Time of the last heartbeat; `None` until the first one arrives.
    pub last_seen: Option<Instant>,
    pub alive: bool,
    pub encrypted: bool,
    /// Set when an upgrade failed and the retry policy forbids another try.
    pub upgrade_blocked: bool,
    /// Set when an upgrade failed and is waiting for the next retry.
    pub upgrade_pending: bool,
}

impl RegistryEntry {
    fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            last_seen: None,
            alive: true,
            encrypted: false,
            upgrade_blocked: false,
            upgrade_pending: false,
        }
    }
}

/// Result of [`DeviceRegistry::upsert_on_discovery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A new entry was created in slot `index`.
    Inserted { index: usize },
    /// A dead entry was brought back to life at the plaintext stage.
    Revived { index: usize },
    /// No slot was free for a new address.
    RejectedFull,
    /// The address is already tracked and alive.
    RejectedAlreadyAlive { index: usize },
}

/// Result of [`DeviceRegistry::mark_heartbeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Updated { index: usize },
    UnknownPeer,
}

/// Emitted by [`DeviceRegistry::sweep`] for each entry it declares dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessLost {
    pub index: usize,
    pub address: DeviceAddress,
    /// Time since the entry's last heartbeat.
    pub silence: Duration,
}

/// Fixed-capacity table of clients keyed by hardware address.
#[derive(Debug)]
pub struct DeviceRegistry {
    capacity: usize,
    slots: Vec<RegistryEntry>,
}

impl DeviceRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of consumed slots, dead entries included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|e| e.alive).count()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&RegistryEntry> {
        self.slots.get(index)
    }

    pub fn index_of(&self, address: DeviceAddress) -> Option<usize> {
        self.slots.iter().position(|e| e.address == address)
    }

    /// Records a valid Discover from `address`.
    pub fn upsert_on_discovery(&mut self, address: DeviceAddress) -> DiscoveryOutcome {
        if let Some(index) = self.index_of(address) {
            let entry = &mut self.slots[index];
            if entry.alive {
                return DiscoveryOutcome::RejectedAlreadyAlive { index };
            }
            *entry = RegistryEntry::new(address);
            return DiscoveryOutcome::Revived { index };
        }

        if self.slots.len() >= self.capacity {
            return DiscoveryOutcome::RejectedFull;
        }
        self.slots.push(RegistryEntry::new(address));
        DiscoveryOutcome::Inserted {
            index: self.slots.len() - 1,
        }
    }

    /// Records a heartbeat from `address` at `now`, marking it alive.
    pub fn mark_heartbeat(&mut self, address: DeviceAddress, now: Instant) -> HeartbeatOutcome {
        match self.index_of(address) {
            Some(index) => {
                let entry = &mut self.slots[index];
                entry.last_seen = Some(now);
                entry.alive = true;
                HeartbeatOutcome::Updated { index }
            }
            None => HeartbeatOutcome::UnknownPeer,
        }
    }

    /// Marks every alive entry silent for longer than `timeout` as dead.
    ///
    /// Entries that have never heartbeated are skipped.
    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> Vec<LivenessLost> {
        let mut lost = Vec::new();
        for (index, entry) in self.slots.iter_mut().enumerate() {
            let Some(last_seen) = entry.last_seen else {
                continue;
            };
            if !entry.alive {
                continue;
            }
            let silence = now.saturating_duration_since(last_seen);
            if silence > timeout {
                entry.alive = false;
                lost.push(LivenessLost {
                    index,
                    address: entry.address,
                    silence,
                });
            }
        }
        lost
    }

    pub fn set_encrypted(&mut self, index: usize) {
        if let Some(entry) = self.slots.get_mut(index) {
            entry.encrypted = true;
            entry.upgrade_blocked = false;
            entry.upgrade_pending = false;
        }
    }

    pub fn block_upgrade(&mut self, index: usize) {
        if let Some(entry) = self.slots.get_mut(index) {
            entry.upgrade_blocked = true;
            entry.upgrade_pending = false;
        }
    }

    /// Flags a failed upgrade for another attempt.
    pub fn defer_upgrade(&mut self, index: usize) {
        if let Some(entry) = self.slots.get_mut(index) {
            entry.upgrade_pending = true;
        }
    }

    /// Alive entries with a deferred upgrade, as `(index, address)` pairs.
    pub fn pending_upgrades(&self) -> Vec<(usize, DeviceAddress)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive && e.upgrade_pending && !e.encrypted)
            .map(|(index, e)| (index, e.address))
            .collect()
    }

    /// Marks the entry dead and unencrypted without waiting for it to go silent.
    pub fn mark_dead(&mut self, index: usize) {
        if let Some(entry) = self.slots.get_mut(index) {
            entry.alive = false;
            entry.encrypted = false;
            entry.upgrade_pending = false;
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

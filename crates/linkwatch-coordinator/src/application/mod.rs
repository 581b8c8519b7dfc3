//! Application layer for the coordinator.
//!
//! Everything here is synchronous and free of I/O.  Time comes from a
//! [`linkwatch_core::Clock`] and the radio from a
//! [`linkwatch_core::RadioTransport`], so every rule can be exercised with
//! the recording radio and a manual clock.
//!
//! # Sub-modules
//!
//! - **`registry`**  – The bounded table of known clients.
//! - **`protocol_core`** – [`protocol_core::ProtocolCore`], the single owner of the registry
//!   and the secure channels.
//! - **`handshake`** – Inbound frame handling: pairing, revival, heartbeats and
//!   the encrypted upgrade.
//! - **`liveness`**  – The periodic sweep that declares silent clients dead.
//! - **`console`**   – Operator command parsing and dispatch.

pub mod console;
pub mod protocol_core;
pub mod handshake;
pub mod liveness;
pub mod registry;

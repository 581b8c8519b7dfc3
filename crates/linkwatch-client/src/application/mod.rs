//! Application layer use cases for the client.
//!
//! - **`session`** – the client side of the handshake: discover, pair,
//!   heartbeat, and the one-time link upgrade.  Owns the secure channel to
//!   the coordinator and routes commands it sends.
//!
//! - **`commands`** – turns a received [`CommandKind`](linkwatch_core::CommandKind)
//!   into an effect on the device through the injected
//!   [`DeviceActuator`](commands::DeviceActuator).
//!
//! Nothing here performs I/O directly; the radio and the device are trait
//! objects supplied by the infrastructure layer.

pub mod commands;
pub mod session;

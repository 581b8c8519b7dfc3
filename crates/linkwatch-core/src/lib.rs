//! # linkwatch-core
//!
//! Shared library for linkwatch containing the radio frame codec, device
//! identities and pre-shared secrets, the secure channel manager, and the
//! transport seam both roles talk through.
//!
//! This crate is used by both the coordinator and client applications.
//! It has zero dependencies on sockets, async runtimes, or the console.
//!
//! # Architecture overview
//!
//! linkwatch lets one *coordinator* device discover, authenticate and monitor
//! a small, fixed number of *client* devices over a connectionless,
//! broadcast-capable radio with no delivery guarantees.
//!
//! - **`protocol`** – How bytes travel over the radio.  Every exchange is a
//!   fixed 64-byte frame (`[type:1][payload:63]`), decoded into the typed
//!   [`Message`] sum type on the receiving end.
//!
//! - **`domain`** – Hardware addresses, the discovery secret, the network key
//!   and the per-client link keys derived from it, plus the shared
//!   `[protocol]` configuration section.
//!
//! - **`transport`** – The [`RadioTransport`] trait the radio subsystem must
//!   implement, and a recording mock used across the workspace's tests.
//!
//! - **`channel`** – The [`SecureChannelManager`], which owns the plaintext →
//!   encrypted promotion of each peer link.
//!
//! - **`clock`** – Monotonic time source, swappable for a manual clock so
//!   liveness logic can be tested without sleeping.
//!
//! - **`error`** – The protocol error taxonomy every inbound path reports.
//!
//! - **`config_store`** – Where each role's TOML config file lives and how
//!   it is loaded and saved.

pub mod channel;
pub mod clock;
pub mod config_store;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod transport;

pub use channel::{ChannelError, ChannelRole, LinkState, SecureChannelManager, UpgradeOutcome};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use domain::address::DeviceAddress;
pub use domain::secrets::{DiscoverySecret, LinkKey, NetworkKey, ProtocolConfig};
pub use error::ProtocolError;
pub use protocol::frame::{
    decode_message, encode_message, CommandKind, Frame, FrameError, FrameType, Message,
    FRAME_SIZE, PAYLOAD_CAPACITY,
};
pub use transport::{InboundFrame, RadioTransport, TransportError};

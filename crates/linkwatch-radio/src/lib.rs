//! # linkwatch-radio
//!
//! Emulates the connectionless, broadcast-capable radio linkwatch runs on,
//! using UDP broadcast on a shared port.  Every role on the segment binds the
//! same port; each datagram carries an envelope naming the sending and
//! receiving hardware addresses, and receivers filter on it exactly as a
//! radio's MAC layer would.
//!
//! - **`envelope`** – The datagram header around each 64-byte frame.
//! - **`crypto`** – AES-128-GCM sealing of frames on encrypted links.
//! - **`peers`** – The bounded peer table with its one-relationship-per-address rule.
//! - **`udp`** – [`UdpRadio`], the [`linkwatch_core::RadioTransport`] implementation.
//! - **`config`** – The `[radio]` configuration section.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod peers;
pub mod udp;

pub use config::RadioConfig;
pub use udp::{RadioError, UdpRadio};

//! Infrastructure layer for the client.
//!
//! - **`actuator`** – [`DeviceActuator`](crate::application::commands::DeviceActuator)
//!   implementations: the host stand-in used by the binary and a recording
//!   mock for tests.
//! - **`storage`** – TOML configuration.
//! - **`runtime`** – the timer-and-radio event loop.

pub mod actuator;
pub mod runtime;
pub mod storage;

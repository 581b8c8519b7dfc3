//! Device actuator implementations.

pub mod host;
pub mod mock;

pub use host::HostActuator;
pub use mock::RecordingActuator;

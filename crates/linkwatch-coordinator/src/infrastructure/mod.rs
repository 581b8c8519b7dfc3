//! Infrastructure layer for the coordinator.
//!
//! OS-facing adapters: configuration storage, the stdin console reader, and
//! the event loop that ties the radio, the console and the liveness timer to
//! the application layer.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `linkwatch_core`, but MUST NOT be imported by the `application` layer.

pub mod console;
pub mod runtime;
pub mod storage;

//! Domain types for linkwatch.
//!
//! Pure value types with no I/O: the hardware address every peer-facing
//! structure is keyed by, and the pre-shared material (discovery secret,
//! network key, derived link keys) both roles are provisioned with.

pub mod address;
pub mod secrets;

//! Pre-shared secrets and link-key derivation.
//!
//! Two independent pieces of material are provisioned on every device:
//!
//! - The [`DiscoverySecret`]: an ASCII token carried in Discover and
//!   Acknowledge payloads.  Holding it proves membership during pairing.
//! - The [`NetworkKey`]: a 16-byte symmetric key that never leaves the
//!   device.  Each client link is encrypted with a [`LinkKey`] derived from it
//!   and the client's hardware address, so both ends compute the same key
//!   without ever sending it.
//!
//! Both are normally loaded from the `[protocol]` section of a role's TOML
//! config via [`ProtocolConfig`].

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::address::DeviceAddress;
use crate::protocol::frame::PAYLOAD_CAPACITY;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label mixed into every link-key derivation.
const LINK_KEY_LABEL: &[u8] = b"linkwatch-lmk";

/// Length in bytes of the network key and of each derived link key.
pub const KEY_LEN: usize = 16;

/// Error type for invalid secret material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("discovery secret must not be empty")]
    EmptySecret,

    #[error("discovery secret is {actual} bytes; at most {max} fit in a frame payload")]
    SecretTooLong { max: usize, actual: usize },

    #[error("discovery secret must be printable ASCII")]
    SecretNotAscii,

    #[error("network key is not valid hex: {0}")]
    InvalidKeyHex(String),

    #[error("network key must be {expected} bytes, got {actual}")]
    WrongKeyLength { expected: usize, actual: usize },
}

// ── Discovery secret ──────────────────────────────────────────────────────────

/// The shared pairing token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiscoverySecret(String);

impl DiscoverySecret {
    /// Validates and wraps `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the secret is empty, not printable ASCII,
    /// or longer than a frame payload.
    pub fn new(secret: &str) -> Result<Self, SecretError> {
        if secret.is_empty() {
            return Err(SecretError::EmptySecret);
        }
        if !secret.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(SecretError::SecretNotAscii);
        }
        if secret.len() > PAYLOAD_CAPACITY {
            return Err(SecretError::SecretTooLong {
                max: PAYLOAD_CAPACITY,
                actual: secret.len(),
            });
        }
        Ok(Self(secret.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an empty secret cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The secret left-aligned in a zeroed payload buffer.
    pub fn padded(&self) -> [u8; PAYLOAD_CAPACITY] {
        let mut buf = [0u8; PAYLOAD_CAPACITY];
        buf[..self.0.len()].copy_from_slice(self.0.as_bytes());
        buf
    }

    /// Returns `true` if `payload` starts with this secret.
    ///
    /// Only the first `self.len()` bytes are compared; whatever follows is
    /// ignored.  The comparison time does not depend on where the first
    /// mismatching byte is.
    pub fn matches(&self, payload: &[u8]) -> bool {
        let expected = self.0.as_bytes();
        if payload.len() < expected.len() {
            return false;
        }
        constant_time_eq(expected, &payload[..expected.len()])
    }
}

impl Default for DiscoverySecret {
    fn default() -> Self {
        Self("TkFLRURfU05BS0U=".to_string())
    }
}

impl fmt::Debug for DiscoverySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiscoverySecret(<{} bytes>)", self.0.len())
    }
}

impl TryFrom<String> for DiscoverySecret {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DiscoverySecret> for String {
    fn from(secret: DiscoverySecret) -> Self {
        secret.0
    }
}

// ── Network key ───────────────────────────────────────────────────────────────

/// The process-wide pre-shared symmetric key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkKey([u8; KEY_LEN]);

impl NetworkKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a 32-character hex string.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidKeyHex`] or [`SecretError::WrongKeyLength`].
    pub fn from_hex(text: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(text.trim()).map_err(|e| SecretError::InvalidKeyHex(e.to_string()))?;
        let key: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SecretError::WrongKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Derives the link key for the session with `client`.
    ///
    /// `link_key = HMAC-SHA256(network_key, "linkwatch-lmk" || client)[..16]`
    ///
    /// The coordinator passes the peer's address; a client passes its own.
    pub fn derive_link_key(&self, client: DeviceAddress) -> LinkKey {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(LINK_KEY_LABEL);
        mac.update(&client.octets());
        let digest = mac.finalize().into_bytes();

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest[..KEY_LEN]);
        LinkKey(key)
    }
}

impl Default for NetworkKey {
    fn default() -> Self {
        Self([
            0xF3, 0x26, 0xA5, 0xC3, 0x9C, 0xC0, 0x8E, 0xC0, 0x15, 0xAB, 0x90, 0x69, 0x8C, 0x7E,
            0x6F, 0x8C,
        ])
    }
}

impl fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NetworkKey(<redacted>)")
    }
}

impl TryFrom<String> for NetworkKey {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<NetworkKey> for String {
    fn from(key: NetworkKey) -> Self {
        key.to_hex()
    }
}

// ── Link key ──────────────────────────────────────────────────────────────────

/// A per-client key installed on an encrypted peer relationship.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LinkKey([u8; KEY_LEN]);

impl LinkKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkKey(<redacted>)")
    }
}

// ── Shared config section ─────────────────────────────────────────────────────

/// The `[protocol]` section shared by the coordinator and client configs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Token carried in Discover/Acknowledge payloads.
    #[serde(default)]
    pub discovery_secret: DiscoverySecret,
    /// 32 hex characters; never transmitted.
    #[serde(default)]
    pub network_key: NetworkKey,
}

/// Compares two equal-length slices without short-circuiting.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

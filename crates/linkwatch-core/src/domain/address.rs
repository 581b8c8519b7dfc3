//! Six-byte hardware addresses.
//!
//! A [`DeviceAddress`] identifies one radio interface and is the primary key
//! of the coordinator's registry and of every peer table.  The all-ones
//! address [`DeviceAddress::BROADCAST`] is reserved: frames sent to it reach
//! every listener and it never names a paired peer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a textual address fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The string did not contain exactly six groups.
    #[error("expected 6 octets, found {0}")]
    WrongOctetCount(usize),

    /// One group was not a two-digit hexadecimal number.
    #[error("invalid octet '{0}'")]
    InvalidOctet(String),
}

/// A 6-byte hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    /// The broadcast address `FF:FF:FF:FF:FF:FF`.
    pub const BROADCAST: DeviceAddress = DeviceAddress([0xFF; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Builds a unicast, locally administered address from arbitrary bytes.
    ///
    /// Bit 1 of the first octet is set (locally administered) and bit 0 is
    /// cleared (unicast), so the result can never collide with
    /// [`DeviceAddress::BROADCAST`].
    pub fn locally_administered(mut octets: [u8; 6]) -> Self {
        octets[0] = (octets[0] | 0x02) & !0x01;
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 6]> for DeviceAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl TryFrom<&[u8]> for DeviceAddress {
    type Error = AddressParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| AddressParseError::WrongOctetCount(bytes.len()))?;
        Ok(Self(octets))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceAddress({self})")
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    /// Parses `AA:BB:CC:DD:EE:FF` (or `-` separated), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.trim().split(|c: char| c == ':' || c == '-').collect();
        if groups.len() != 6 {
            return Err(AddressParseError::WrongOctetCount(groups.len()));
        }

        let mut octets = [0u8; 6];
        for (slot, group) in octets.iter_mut().zip(&groups) {
            if group.len() != 2 {
                return Err(AddressParseError::InvalidOctet((*group).to_string()));
            }
            *slot = u8::from_str_radix(group, 16)
                .map_err(|_| AddressParseError::InvalidOctet((*group).to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceAddress> for String {
    fn from(addr: DeviceAddress) -> Self {
        addr.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_uppercase_colon_separated() {
        let addr = DeviceAddress::new([0x24, 0x0a, 0xc4, 0x01, 0x02, 0xff]);
        assert_eq!(addr.to_string(), "24:0A:C4:01:02:FF");
    }

    #[test]
    fn test_parse_accepts_lowercase_and_dashes() {
        let addr: DeviceAddress = "24-0a-c4-01-02-ff".parse().unwrap();
        assert_eq!(addr.octets(), [0x24, 0x0A, 0xC4, 0x01, 0x02, 0xFF]);
    }

    #[test]
    fn test_parse_rejects_wrong_group_count() {
        assert_eq!(
            "24:0A:C4:01:02".parse::<DeviceAddress>(),
            Err(AddressParseError::WrongOctetCount(5))
        );
    }

    #[test]
    fn test_parse_rejects_non_hex_octet() {
        assert_eq!(
            "24:0A:C4:01:02:ZZ".parse::<DeviceAddress>(),
            Err(AddressParseError::InvalidOctet("ZZ".to_string()))
        );
    }

    #[test]
    fn test_broadcast_is_all_ones() {
        assert!(DeviceAddress::BROADCAST.is_broadcast());
        assert_eq!(DeviceAddress::BROADCAST.to_string(), "FF:FF:FF:FF:FF:FF");
    }

    #[test]
    fn test_locally_administered_is_never_broadcast() {
        let addr = DeviceAddress::locally_administered([0xFF; 6]);
        assert!(!addr.is_broadcast());
        assert_eq!(addr.octets()[0] & 0x03, 0x02);
    }

    #[test]
    fn test_try_from_slice_requires_six_bytes() {
        assert!(DeviceAddress::try_from(&[1u8, 2, 3][..]).is_err());
        assert!(DeviceAddress::try_from(&[1u8, 2, 3, 4, 5, 6][..]).is_ok());
    }
}

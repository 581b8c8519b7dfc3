//! The `[radio]` configuration section.

use std::net::Ipv4Addr;

use linkwatch_core::DeviceAddress;
use serde::{Deserialize, Serialize};

/// Settings for the UDP radio emulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// UDP port every role on the segment shares.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Local interface to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: Ipv4Addr,
    /// Where every datagram is sent.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    /// Hardware address of this node; a random locally administered one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_address: Option<DeviceAddress>,
    /// Peer-table size.
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,
    /// How many of those peers may hold a link key.
    #[serde(default = "default_max_encrypted_peers")]
    pub max_encrypted_peers: usize,
}

fn default_port() -> u16 {
    47800
}

fn default_bind_address() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_broadcast_address() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_max_peers() -> usize {
    20
}

fn default_max_encrypted_peers() -> usize {
    6
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            broadcast_address: default_broadcast_address(),
            local_address: None,
            max_peers: default_max_peers(),
            max_encrypted_peers: default_max_encrypted_peers(),
        }
    }
}

impl RadioConfig {
    /// Describes the first invalid field, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("radio.port must be non-zero".into());
        }
        if self.max_peers == 0 {
            return Err("radio.max_peers must be at least 1".into());
        }
        if self.max_encrypted_peers > self.max_peers {
            return Err("radio.max_encrypted_peers cannot exceed radio.max_peers".into());
        }
        if self.local_address.is_some_and(|a| a.is_broadcast()) {
            return Err("radio.local_address cannot be the broadcast address".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RadioConfig::default();
        assert_eq!(cfg.port, 47800);
        assert_eq!(cfg.max_peers, 20);
        assert_eq!(cfg.max_encrypted_peers, 6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let cfg: RadioConfig =
            toml::from_str("port = 50000\nlocal_address = \"02:00:00:00:00:07\"").unwrap();
        assert_eq!(cfg.port, 50000);
        assert_eq!(
            cfg.local_address,
            Some(DeviceAddress::new([0x02, 0, 0, 0, 0, 0x07]))
        );
        assert_eq!(cfg.broadcast_address, Ipv4Addr::BROADCAST);
    }

    #[test]
    fn test_validate_rejects_broadcast_local_address() {
        let cfg = RadioConfig {
            local_address: Some(DeviceAddress::BROADCAST),
            ..RadioConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_more_encrypted_than_total() {
        let cfg = RadioConfig {
            max_peers: 2,
            max_encrypted_peers: 3,
            ..RadioConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}

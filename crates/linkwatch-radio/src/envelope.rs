//! Datagram envelope.
//!
//! ```text
//! [magic "LW":2][version:1][source:6][destination:6][flags:1][body]
//! ```
//!
//! The 16-byte header plays the role of the radio's MAC header.  With flag
//! bit 0 clear the body is the bare 64-byte frame; with it set the body is
//! `nonce(12) || AES-128-GCM(link_key, frame)` and the header is bound in as
//! associated data.

use linkwatch_core::DeviceAddress;
use thiserror::Error;

pub const MAGIC: [u8; 2] = *b"LW";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 16;

const FLAG_SEALED: u8 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("datagram of {0} bytes is shorter than the header")]
    Truncated(usize),

    #[error("bad magic")]
    BadMagic,

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
}

/// The addressing part of a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub source: DeviceAddress,
    pub destination: DeviceAddress,
    pub sealed: bool,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2] = VERSION;
        buf[3..9].copy_from_slice(&self.source.octets());
        buf[9..15].copy_from_slice(&self.destination.octets());
        buf[15] = if self.sealed { FLAG_SEALED } else { 0 };
        buf
    }
}

/// Prepends `header` to `body`.
pub fn encode(header: &Header, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(body);
    out
}

/// Splits a datagram into its header and body.
pub fn decode(datagram: &[u8]) -> Result<(Header, &[u8]), EnvelopeError> {
    if datagram.len() < HEADER_LEN {
        return Err(EnvelopeError::Truncated(datagram.len()));
    }
    if datagram[0..2] != MAGIC {
        return Err(EnvelopeError::BadMagic);
    }
    if datagram[2] != VERSION {
        return Err(EnvelopeError::UnsupportedVersion(datagram[2]));
    }

    let mut source = [0u8; 6];
    source.copy_from_slice(&datagram[3..9]);
    let mut destination = [0u8; 6];
    destination.copy_from_slice(&datagram[9..15]);

    let header = Header {
        source: DeviceAddress::new(source),
        destination: DeviceAddress::new(destination),
        sealed: datagram[15] & FLAG_SEALED != 0,
    };
    Ok((header, &datagram[HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(sealed: bool) -> Header {
        Header {
            source: DeviceAddress::new([0x02, 0, 0, 0, 0, 1]),
            destination: DeviceAddress::BROADCAST,
            sealed,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = header(true).to_bytes();
        assert_eq!(&bytes[0..3], b"LW\x01");
        assert_eq!(&bytes[3..9], &[0x02, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[9..15], &[0xFF; 6]);
        assert_eq!(bytes[15], 0x01);
    }

    #[test]
    fn test_decode_splits_header_and_body() {
        let datagram = encode(&header(false), &[7u8; 64]);
        let (h, body) = decode(&datagram).unwrap();
        assert_eq!(h, header(false));
        assert_eq!(body, &[7u8; 64][..]);
    }

    #[test]
    fn test_decode_rejects_short_and_foreign_datagrams() {
        assert_eq!(decode(&[0u8; 4]), Err(EnvelopeError::Truncated(4)));

        let mut foreign = encode(&header(false), &[]);
        foreign[0] = b'X';
        assert_eq!(decode(&foreign), Err(EnvelopeError::BadMagic));

        let mut future = encode(&header(false), &[]);
        future[2] = 9;
        assert_eq!(decode(&future), Err(EnvelopeError::UnsupportedVersion(9)));
    }
}

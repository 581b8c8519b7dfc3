//! Fixed-size frame codec for the linkwatch radio protocol.
//!
//! Wire format:
//! ```text
//! [type:1][payload:63]
//! ```
//! Total frame size: 64 bytes.  There are no multi-byte integer fields; the
//! payload is opaque at this layer.
//!
//! Decoding happens in two steps:
//!
//! 1. [`decode_frame`] checks the length and nothing else.  A buffer that is
//!    not exactly [`FRAME_SIZE`] bytes is rejected without being looked at.
//! 2. [`Message::from_frame`] interprets the type tag and the per-type payload
//!    schema, producing a [`Message`] the role state machines can match on.
//!
//! # Payload schemas
//!
//! | Type | Tag | Payload |
//! |---|---|---|
//! | Discover | 0 | discovery secret, left-aligned, zero-padded |
//! | Acknowledge | 1 | discovery secret, left-aligned, zero-padded |
//! | Heartbeat | 2 | unused, zero |
//! | Command | 3 | byte 0 = [`CommandKind`], rest zero |

use thiserror::Error;

use crate::domain::secrets::DiscoverySecret;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Total size of every frame on the wire.
pub const FRAME_SIZE: usize = 64;

/// Bytes available after the one-byte type tag.
pub const PAYLOAD_CAPACITY: usize = FRAME_SIZE - 1;

// ── Frame type tags ───────────────────────────────────────────────────────────

/// All frame type tags defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Client → broadcast: "I hold the secret, pair with me".
    Discover = 0,
    /// Coordinator → client: "paired; here is my address".
    Acknowledge = 1,
    /// Client → coordinator: periodic liveness signal.
    Heartbeat = 2,
    /// Coordinator → client: operator-issued command.
    Command = 3,
}

impl TryFrom<u8> for FrameType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameType::Discover),
            1 => Ok(FrameType::Acknowledge),
            2 => Ok(FrameType::Heartbeat),
            3 => Ok(FrameType::Command),
            _ => Err(()),
        }
    }
}

/// Command codes carried in byte 0 of a Command payload.
///
/// `SystemInfo` and `WifiScan` are part of the declared set but no client
/// implements them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    LedToggle = 0,
    Reboot = 1,
    SystemInfo = 2,
    WifiScan = 3,
}

impl TryFrom<u8> for CommandKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandKind::LedToggle),
            1 => Ok(CommandKind::Reboot),
            2 => Ok(CommandKind::SystemInfo),
            3 => Ok(CommandKind::WifiScan),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandKind::LedToggle => "led-toggle",
            CommandKind::Reboot => "reboot",
            CommandKind::SystemInfo => "system-info",
            CommandKind::WifiScan => "wifi-scan",
        };
        f.write_str(name)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The received buffer is not exactly one frame long.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The caller tried to encode more payload than fits in a frame.
    #[error("payload of {actual} bytes exceeds the {capacity}-byte capacity")]
    PayloadTooLarge { capacity: usize, actual: usize },

    /// The type tag is not one of the four defined values.
    #[error("unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    /// The first byte of a Command payload is not a defined command.
    #[error("unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),
}

// ── Raw frame ─────────────────────────────────────────────────────────────────

/// One size-validated frame: a type tag plus a zero-padded payload.
///
/// The tag is kept raw so that a frame with an unrecognised tag still
/// round-trips through [`decode_frame`]; interpretation is deferred to
/// [`Message::from_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    tag: u8,
    payload: [u8; PAYLOAD_CAPACITY],
}

impl Frame {
    /// Returns the raw type tag byte.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Interprets the tag as a [`FrameType`].
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFrameType`] for tags outside `0..=3`.
    pub fn frame_type(&self) -> Result<FrameType, FrameError> {
        FrameType::try_from(self.tag).map_err(|_| FrameError::UnknownFrameType(self.tag))
    }

    /// Returns the full fixed-capacity payload, padding included.
    pub fn payload(&self) -> &[u8; PAYLOAD_CAPACITY] {
        &self.payload
    }

    /// Serialises the frame into its 64-byte wire form.
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0] = self.tag;
        buf[1..].copy_from_slice(&self.payload);
        buf
    }
}

/// Builds a frame of `frame_type` carrying `payload`, zero-padding the rest.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] when `payload` is longer than
/// [`PAYLOAD_CAPACITY`].  The payload is never silently truncated.
///
/// # Examples
///
/// ```rust
/// use linkwatch_core::protocol::{encode_frame, FrameType, FRAME_SIZE};
///
/// let frame = encode_frame(FrameType::Heartbeat, &[]).unwrap();
/// assert_eq!(frame.to_bytes().len(), FRAME_SIZE);
/// assert_eq!(frame.to_bytes()[0], 2);
/// ```
pub fn encode_frame(frame_type: FrameType, payload: &[u8]) -> Result<Frame, FrameError> {
    if payload.len() > PAYLOAD_CAPACITY {
        return Err(FrameError::PayloadTooLarge {
            capacity: PAYLOAD_CAPACITY,
            actual: payload.len(),
        });
    }

    let mut padded = [0u8; PAYLOAD_CAPACITY];
    padded[..payload.len()].copy_from_slice(payload);
    Ok(Frame {
        tag: frame_type as u8,
        payload: padded,
    })
}

/// Decodes one frame from `bytes`.
///
/// The only check performed is the exact length.
///
/// # Errors
///
/// Returns [`FrameError::SizeMismatch`] if `bytes.len() != FRAME_SIZE`.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() != FRAME_SIZE {
        return Err(FrameError::SizeMismatch {
            expected: FRAME_SIZE,
            actual: bytes.len(),
        });
    }

    let mut payload = [0u8; PAYLOAD_CAPACITY];
    payload.copy_from_slice(&bytes[1..]);
    Ok(Frame {
        tag: bytes[0],
        payload,
    })
}

// ── Typed messages ────────────────────────────────────────────────────────────

/// All valid protocol messages, discriminated by frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Pairing request; the payload should start with the discovery secret.
    Discover { payload: [u8; PAYLOAD_CAPACITY] },
    /// Pairing reply; the payload should start with the discovery secret.
    Acknowledge { payload: [u8; PAYLOAD_CAPACITY] },
    Heartbeat,
    Command(CommandKind),
}

impl Message {
    /// A Discover message carrying `secret`, zero-padded.
    pub fn discover(secret: &DiscoverySecret) -> Self {
        Message::Discover {
            payload: secret.padded(),
        }
    }

    /// An Acknowledge message carrying `secret`, zero-padded.
    pub fn acknowledge(secret: &DiscoverySecret) -> Self {
        Message::Acknowledge {
            payload: secret.padded(),
        }
    }

    /// Returns the [`FrameType`] tag for this message.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Message::Discover { .. } => FrameType::Discover,
            Message::Acknowledge { .. } => FrameType::Acknowledge,
            Message::Heartbeat => FrameType::Heartbeat,
            Message::Command(_) => FrameType::Command,
        }
    }

    /// Lowers the message into a raw frame.
    pub fn to_frame(&self) -> Frame {
        let payload = match self {
            Message::Discover { payload } | Message::Acknowledge { payload } => *payload,
            Message::Heartbeat => [0u8; PAYLOAD_CAPACITY],
            Message::Command(kind) => {
                let mut p = [0u8; PAYLOAD_CAPACITY];
                p[0] = *kind as u8;
                p
            }
        };
        Frame {
            tag: self.frame_type() as u8,
            payload,
        }
    }

    /// Interprets a size-validated frame according to its type tag.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFrameType`] or
    /// [`FrameError::UnknownCommand`] for values outside the declared sets.
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.frame_type()? {
            FrameType::Discover => Ok(Message::Discover {
                payload: frame.payload,
            }),
            FrameType::Acknowledge => Ok(Message::Acknowledge {
                payload: frame.payload,
            }),
            FrameType::Heartbeat => Ok(Message::Heartbeat),
            FrameType::Command => {
                let code = frame.payload[0];
                CommandKind::try_from(code)
                    .map(Message::Command)
                    .map_err(|_| FrameError::UnknownCommand(code))
            }
        }
    }
}

/// Encodes a [`Message`] into its 64-byte wire form.
///
/// # Examples
///
/// ```rust
/// use linkwatch_core::protocol::{decode_message, encode_message, CommandKind, Message};
///
/// let bytes = encode_message(&Message::Command(CommandKind::Reboot));
/// assert_eq!(bytes[0], 3);
/// assert_eq!(bytes[1], 1);
/// assert_eq!(decode_message(&bytes).unwrap(), Message::Command(CommandKind::Reboot));
/// ```
pub fn encode_message(msg: &Message) -> [u8; FRAME_SIZE] {
    msg.to_frame().to_bytes()
}

/// Decodes and interprets one message from `bytes`.
///
/// # Errors
///
/// Returns [`FrameError`] if the size is wrong or the tag/command is unknown.
pub fn decode_message(bytes: &[u8]) -> Result<Message, FrameError> {
    let frame = decode_frame(bytes)?;
    Message::from_frame(&frame)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

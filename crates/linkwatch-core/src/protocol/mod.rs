//! Protocol module containing the fixed-size frame codec and message types.

pub mod frame;

pub use frame::{
    decode_frame, decode_message, encode_frame, encode_message, CommandKind, Frame, FrameError,
    FrameType, Message, FRAME_SIZE, PAYLOAD_CAPACITY,
};

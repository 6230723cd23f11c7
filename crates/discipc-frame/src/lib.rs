//! Opcode + length-prefixed frame codec.
//!
//! Every frame on the wire is:
//! - A 4-byte little-endian opcode
//! - A 4-byte little-endian payload length
//! - Exactly `length` payload bytes
//!
//! Reads are all-or-nothing: a short read at any stage fails the whole frame.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_frame, encode_header, Frame, FrameConfig, Opcode, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use handshake::{Handshake, HANDSHAKE_VERSION};
pub use reader::FrameReader;
pub use writer::FrameWriter;

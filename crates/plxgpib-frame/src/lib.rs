//! Reply decoding for GPIB instruments behind a Prologix adapter.
//!
//! Two reply shapes are understood:
//! - Binary trace blocks: an optional run of garbage, a marker (`#A` by
//!   default), a 2-byte big-endian payload length and packed IEEE-754 values
//! - Free-form ASCII text with floating-point literals mixed into units and
//!   delimiters
//!
//! Which one applies is decided by a [`ValueFormat`].

pub mod ascii;
pub mod codec;
pub mod error;
pub mod format;

pub use ascii::{ascii_values, parse_ascii};
pub use codec::{
    decode_block, decode_reply, encode_block, DEFAULT_HEADER, LENGTH_FIELD_SIZE, MAX_BLOCK_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use format::{ByteOrder, Encoding, Precision, ValueFormat, ASCII, BIG_ENDIAN, DOUBLE, SINGLE};

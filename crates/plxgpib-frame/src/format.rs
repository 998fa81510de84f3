//! Value format descriptors.
//!
//! The legacy integer form is a 3-bit field:
//!
//! | bit | set         | clear         |
//! |-----|-------------|---------------|
//! | 0   | binary      | ascii         |
//! | 1   | double      | single        |
//! | 2   | big-endian  | little-endian |
//!
//! Bits 1 and 2 carry no meaning when bit 0 is clear.

use crate::error::{FrameError, Result};

/// ASCII text replies.
pub const ASCII: u8 = 0;
/// Binary 4-byte IEEE-754 values.
pub const SINGLE: u8 = 1;
/// Binary 8-byte IEEE-754 values.
pub const DOUBLE: u8 = 3;
/// Big-endian flag, combined with [`SINGLE`] or [`DOUBLE`].
pub const BIG_ENDIAN: u8 = 4;

const BINARY_BIT: u8 = 0x01;
const DOUBLE_BIT: u8 = 0x02;
const BIG_ENDIAN_BIT: u8 = 0x04;
const KNOWN_BITS: u8 = BINARY_BIT | DOUBLE_BIT | BIG_ENDIAN_BIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl Precision {
    /// Element width in bytes.
    pub fn width(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// How an instrument reply should be turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueFormat {
    pub encoding: Encoding,
    pub precision: Precision,
    pub byte_order: ByteOrder,
}

impl ValueFormat {
    /// Free-form ASCII replies.
    pub const fn ascii() -> Self {
        Self {
            encoding: Encoding::Ascii,
            precision: Precision::Single,
            byte_order: ByteOrder::Little,
        }
    }

    /// Little-endian 4-byte floats.
    pub const fn single() -> Self {
        Self {
            encoding: Encoding::Binary,
            precision: Precision::Single,
            byte_order: ByteOrder::Little,
        }
    }

    /// Little-endian 8-byte floats.
    pub const fn double() -> Self {
        Self {
            encoding: Encoding::Binary,
            precision: Precision::Double,
            byte_order: ByteOrder::Little,
        }
    }

    /// Same format with big-endian values.
    pub const fn big_endian(self) -> Self {
        Self {
            byte_order: ByteOrder::Big,
            ..self
        }
    }

    pub fn is_ascii(&self) -> bool {
        self.encoding == Encoding::Ascii
    }

    /// Parse the legacy bitfield form.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !KNOWN_BITS != 0 {
            return Err(FrameError::UnsupportedFormat(bits));
        }
        if bits & BINARY_BIT == 0 {
            return Ok(Self::ascii());
        }
        let precision = if bits & DOUBLE_BIT != 0 {
            Precision::Double
        } else {
            Precision::Single
        };
        let byte_order = if bits & BIG_ENDIAN_BIT != 0 {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        };
        Ok(Self {
            encoding: Encoding::Binary,
            precision,
            byte_order,
        })
    }

    /// Legacy bitfield form. ASCII formats always map to [`ASCII`].
    pub fn bits(&self) -> u8 {
        if self.is_ascii() {
            return ASCII;
        }
        let mut bits = SINGLE;
        if self.precision == Precision::Double {
            bits |= DOUBLE;
        }
        if self.byte_order == ByteOrder::Big {
            bits |= BIG_ENDIAN;
        }
        bits
    }
}

impl TryFrom<u8> for ValueFormat {
    type Error = FrameError;

    fn try_from(bits: u8) -> Result<Self> {
        Self::from_bits(bits)
    }
}

/// Errors that can occur while decoding instrument replies.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The block marker is missing, or too few bytes follow it to hold a length.
    #[error("header not found")]
    HeaderNotFound,

    /// The declared payload length exceeds the bytes actually received.
    #[error("truncated frame (declared {declared} bytes, {available} available)")]
    Truncated { declared: usize, available: usize },

    /// The format bitfield does not describe ASCII or a known binary layout.
    #[error("unsupported value format 0x{0:02x}")]
    UnsupportedFormat(u8),

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;

use std::time::Duration;

use bytes::Bytes;
use plxgpib_frame::{ValueFormat, DEFAULT_HEADER};
use plxgpib_transport::ConfigError;

/// Lowest GPIB address a session may target (0 is the controller itself).
pub const MIN_GPIB_ADDRESS: u8 = 1;
/// Highest primary GPIB address.
pub const MAX_GPIB_ADDRESS: u8 = 30;

/// Bytes requested by a session read.
pub const DEFAULT_CHUNK_SIZE: usize = 20 * 1024;

/// Pause after each write to the instrument.
pub const DEFAULT_SESSION_DELAY: Duration = Duration::from_millis(100);

/// Query returning the IEEE-488 status byte.
pub const DEFAULT_STATUS_QUERY: &str = "STB?";

/// How long [`crate::Session::wait_for_srq`] waits by default.
pub const DEFAULT_SRQ_TIMEOUT: Duration = Duration::from_secs(25);

/// Status byte bit set while the instrument requests service.
pub const RQS_BIT: u8 = 0x40;

/// Per-instrument settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// GPIB address of the instrument.
    pub address: u8,
    /// Read-after-write. When off, reads send `++read eoi` first.
    pub auto: bool,
    /// How numeric replies are decoded.
    pub format: ValueFormat,
    /// Pause after each write (slow instruments need more).
    pub delay: Duration,
    /// Extra pause between the write and read halves of a query.
    pub ask_delay: Duration,
    /// Upper bound for a single read.
    pub chunk_size: usize,
    /// Marker preceding binary trace blocks.
    pub header: Bytes,
    /// Query used to read the status byte.
    pub status_query: String,
}

impl SessionConfig {
    /// Defaults for the instrument at `address`.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            auto: true,
            format: ValueFormat::ascii(),
            delay: DEFAULT_SESSION_DELAY,
            ask_delay: Duration::ZERO,
            chunk_size: DEFAULT_CHUNK_SIZE,
            header: Bytes::from_static(DEFAULT_HEADER),
            status_query: DEFAULT_STATUS_QUERY.to_string(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_GPIB_ADDRESS..=MAX_GPIB_ADDRESS).contains(&self.address) {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if self.header.is_empty() {
            return Err(ConfigError::EmptyHeader);
        }
        Ok(())
    }
}

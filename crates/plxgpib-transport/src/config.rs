use std::borrow::Cow;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::ConfigError;

/// Pause after every write so the adapter and instrument can settle.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(100);

/// Bytes requested by a single adapter-level read.
pub const DEFAULT_READ_CHUNK: usize = 100;

/// Socket / serial port timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted timeout (the VISA limit, in seconds).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(4_294_967);

/// Baud rate of the GPIB-USB adapter's virtual serial port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Check that `timeout` lies within the supported range.
///
/// A zero timeout is only accepted when `allow_zero` is set; socket and
/// serial timeouts cannot be zero.
pub fn check_timeout(timeout: Duration, allow_zero: bool) -> Result<(), ConfigError> {
    if (timeout.is_zero() && !allow_zero) || timeout > MAX_TIMEOUT {
        return Err(ConfigError::InvalidTimeout(timeout));
    }
    Ok(())
}

/// Line terminator appended to every command written to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminator(Cow<'static, str>);

impl Terminator {
    /// Line feed, used by the GPIB-Ethernet adapter.
    pub const LF: Terminator = Terminator(Cow::Borrowed("\n"));
    /// Carriage return, used by the GPIB-USB adapter.
    pub const CR: Terminator = Terminator(Cow::Borrowed("\r"));
    /// CR LF.
    pub const CRLF: Terminator = Terminator(Cow::Borrowed("\r\n"));

    /// Build a terminator from an arbitrary sequence.
    ///
    /// Only the final character ends a read on the wire, so it must not
    /// appear earlier in the sequence.
    pub fn new(sequence: impl Into<String>) -> Result<Self, ConfigError> {
        let sequence = sequence.into();
        let Some(last) = sequence.chars().last() else {
            return Err(ConfigError::EmptyTerminator);
        };
        let head = &sequence[..sequence.len() - last.len_utf8()];
        if head.contains(last) {
            return Err(ConfigError::AmbiguousTerminator(sequence));
        }
        Ok(Self(Cow::Owned(sequence)))
    }

    /// Default terminator for the adapter kind behind `endpoint`.
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        if endpoint.is_serial() {
            Self::CR
        } else {
            Self::LF
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Configuration for an adapter link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Timeout for each blocking send / receive.
    pub timeout: Duration,
    /// Pause after each write unless the caller supplies its own.
    pub write_delay: Duration,
    /// Upper bound for a single read.
    pub read_chunk: usize,
    /// Line terminator. `None` selects the endpoint default.
    pub terminator: Option<Terminator>,
    /// Serial adapters only.
    pub baud_rate: u32,
    /// Serial adapters only: RTS/CTS handshaking.
    pub hardware_flow_control: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            write_delay: DEFAULT_WRITE_DELAY,
            read_chunk: DEFAULT_READ_CHUNK,
            terminator: None,
            baud_rate: DEFAULT_BAUD_RATE,
            hardware_flow_control: true,
        }
    }
}

impl LinkConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout(self.timeout, false)?;
        if self.read_chunk == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }

    /// Terminator to use for `endpoint`.
    pub fn terminator_for(&self, endpoint: &Endpoint) -> Terminator {
        self.terminator
            .clone()
            .unwrap_or_else(|| Terminator::for_endpoint(endpoint))
    }
}

use std::time::Duration;

/// Invalid configuration, detected before any I/O is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A timeout is zero or beyond the supported range.
    #[error("timeout value is invalid: {0:?}")]
    InvalidTimeout(Duration),

    /// The line terminator is empty.
    #[error("termination sequence must not be empty")]
    EmptyTerminator,

    /// The final terminator byte also appears earlier in the sequence,
    /// which would end reads prematurely.
    #[error("ambiguous ending in termination sequence {0:?}")]
    AmbiguousTerminator(String),

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The GPIB address is outside 1..=30.
    #[error("invalid GPIB address {0} (expected 1..=30)")]
    InvalidAddress(u8),

    /// The block header is empty.
    #[error("block header must not be empty")]
    EmptyHeader,

    /// A read chunk of zero bytes was requested.
    #[error("read chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors that can occur on the adapter link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to a TCP adapter.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to open a serial adapter.
    #[error("failed to open serial port {path}: {source}")]
    OpenSerial {
        path: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the link (including timeouts).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter closed the link.
    #[error("link closed by adapter")]
    Closed,

    /// The adapter answered a query with something that could not be parsed.
    #[error("unexpected reply to {command:?}: {reply:?}")]
    UnexpectedReply { command: String, reply: String },

    /// The adapter firmware does not know the command.
    #[error("adapter does not support {command:?} (firmware update required)")]
    Unsupported { command: String },

    /// Invalid link configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, TransportError>;

use plxgpib_transport::ConfigError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Link-level failure (closed, timed out, refused). Never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] plxgpib_transport::TransportError),

    /// The reply could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] plxgpib_frame::FrameError),

    /// Invalid session configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The status query did not return a status byte.
    #[error("invalid status byte reply: {0:?}")]
    InvalidStatus(String),

    /// Another thread panicked while holding the shared controller.
    #[error("controller lock poisoned")]
    ControllerPoisoned,
}

pub type Result<T> = std::result::Result<T, SessionError>;

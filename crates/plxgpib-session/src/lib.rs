//! Addressed instrument sessions.
//!
//! A [`Session`] is a cheap handle bound to one GPIB address on a shared
//! controller. Before every operation it re-latches the adapter's address and
//! read-after-write setting if another session changed them, then writes,
//! reads and decodes.

pub mod config;
pub mod connector;
pub mod error;
pub mod session;

pub use config::{
    SessionConfig, DEFAULT_CHUNK_SIZE, DEFAULT_SESSION_DELAY, DEFAULT_SRQ_TIMEOUT,
    DEFAULT_STATUS_QUERY, MAX_GPIB_ADDRESS, MIN_GPIB_ADDRESS, RQS_BIT,
};
pub use connector::{connect, open_session};
pub use error::{Result, SessionError};
pub use session::Session;

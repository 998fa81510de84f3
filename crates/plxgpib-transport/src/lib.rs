//! Prologix GPIB-Ethernet / GPIB-USB controller transport.
//!
//! This is the lowest layer of plxgpib. A [`Controller`] owns one physical
//! link to one adapter and speaks the adapter's `++` line protocol on top of
//! it. Controllers are shared through a [`ControllerRegistry`] so that each
//! physical endpoint is opened at most once.

pub mod config;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod traits;

pub use config::{
    check_timeout, LinkConfig, Terminator, DEFAULT_BAUD_RATE, DEFAULT_READ_CHUNK, DEFAULT_TIMEOUT,
    DEFAULT_WRITE_DELAY, MAX_TIMEOUT,
};
pub use controller::Controller;
pub use endpoint::{Endpoint, DEFAULT_TCP_PORT};
pub use error::{ConfigError, Result, TransportError};
pub use registry::{ControllerRegistry, SharedController};
pub use traits::{ByteLink, LinkStream};

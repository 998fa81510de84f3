//! Talk to GPIB instruments through Prologix adapters.
//!
//! plxgpib drives Prologix GPIB-Ethernet (TCP port 1234) and GPIB-USB
//! (virtual serial port) adapters and decodes the replies of instruments
//! such as the HP 4195A network analyzer.
//!
//! # Crate Structure
//!
//! - [`frame`]: binary trace-block decoding and ASCII value parsing
//! - [`transport`]: adapter links, the `++` command set and the controller registry
//! - [`session`]: addressed instrument sessions sharing one controller
//!
//! ```no_run
//! use plxgpib::session::connect;
//! use plxgpib::transport::{ControllerRegistry, Endpoint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ControllerRegistry::new();
//! let analyzer = connect(&registry, &"192.168.1.50".parse::<Endpoint>()?, 17)?;
//! println!("{}", analyzer.ask("ID?")?);
//! let trace = analyzer.ask_for_values("FMT1;A?")?;
//! println!("{} points", trace.len());
//! # Ok(())
//! # }
//! ```

/// Re-export frame types.
pub mod frame {
    pub use plxgpib_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use plxgpib_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use plxgpib_session::*;
}

use plxgpib_transport::{ControllerRegistry, Endpoint, LinkConfig};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Open a session to the instrument at `address` behind `endpoint` with
/// default settings.
pub fn connect(registry: &ControllerRegistry, endpoint: &Endpoint, address: u8) -> Result<Session> {
    open_session(
        registry,
        endpoint,
        &LinkConfig::default(),
        SessionConfig::new(address),
    )
}

/// Open a session with explicit configuration.
///
/// Both configurations are validated before the adapter is opened. The
/// adapter is opened only if the registry does not already hold it; in that
/// case `link_config` is ignored.
pub fn open_session(
    registry: &ControllerRegistry,
    endpoint: &Endpoint,
    link_config: &LinkConfig,
    config: SessionConfig,
) -> Result<Session> {
    link_config.validate()?;
    config.validate()?;
    let controller = registry.get_or_open(endpoint, link_config)?;
    Session::new(controller, config)
}

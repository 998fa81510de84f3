use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::LinkConfig;
use crate::controller::Controller;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// A controller shared between the sessions that talk through it.
///
/// Hold the lock for the whole address-write-read sequence of one operation.
pub type SharedController = Arc<Mutex<Controller>>;

/// Process-scoped set of open adapters, keyed by endpoint identity.
///
/// Each physical endpoint is opened at most once. Create one registry at
/// startup, hand it to whatever opens sessions, and call
/// [`ControllerRegistry::close_all`] at shutdown. A link is closed once the
/// registry and every session holding it have let go.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: Mutex<HashMap<String, SharedController>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the controller for `endpoint`, opening it on first use.
    ///
    /// `config` only applies when the link is actually opened. The registry
    /// lock is held across the open so concurrent callers for one endpoint
    /// never open two links; every other registry call waits for it, up to
    /// the link timeout plus the write delay.
    pub fn get_or_open(&self, endpoint: &Endpoint, config: &LinkConfig) -> Result<SharedController> {
        let key = endpoint.identity();
        let mut controllers = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = controllers.get(&key) {
            debug!(endpoint = %key, "reusing open controller");
            return Ok(Arc::clone(existing));
        }

        let controller = Arc::new(Mutex::new(Controller::open(endpoint, config)?));
        controllers.insert(key.clone(), Arc::clone(&controller));
        debug!(endpoint = %key, "registered controller");
        Ok(controller)
    }

    /// The controller for `endpoint`, if one is open.
    pub fn get(&self, endpoint: &Endpoint) -> Option<SharedController> {
        self.controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint.identity())
            .cloned()
    }

    /// Forget the controller for `endpoint`. Returns whether one was registered.
    pub fn close(&self, endpoint: &Endpoint) -> bool {
        let removed = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&endpoint.identity())
            .is_some();
        if removed {
            debug!(%endpoint, "closed controller");
        }
        removed
    }

    /// Forget every controller. Returns how many were registered.
    pub fn close_all(&self) -> usize {
        let mut controllers = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = controllers.len();
        controllers.clear();
        debug!(count, "closed all controllers");
        count
    }

    pub fn len(&self) -> usize {
        self.controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let controllers = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut endpoints: Vec<&String> = controllers.keys().collect();
        endpoints.sort();
        f.debug_struct("ControllerRegistry")
            .field("endpoints", &endpoints)
            .finish()
    }
}

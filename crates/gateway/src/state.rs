//! Shared handler state.

use std::sync::Arc;

use roster_service_lib::service::RosterService;

use crate::config::GatewayConfig;

/// Cloned into every request; the roster service sits behind a trait object
/// so tests can swap in the in-memory store or a mock.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn RosterService>,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(roster: Arc<dyn RosterService>, config: GatewayConfig) -> Self {
        Self { roster, config }
    }
}

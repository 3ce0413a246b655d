//! Service layer.

mod roster_service;

#[cfg(any(test, feature = "test-utils"))]
pub use roster_service::MockRosterService;
pub use roster_service::{RosterManager, RosterService, Template};

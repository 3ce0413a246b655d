//! Repository layer for roster data access.

pub mod entities;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod roster_store;
mod unit_of_work;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryRoster;
pub use roster_store::RosterStore;
pub use unit_of_work::{RosterTx, UnitOfWork};

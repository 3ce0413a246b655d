//! Bulk roster import.
//!
//! An upload flows through [`sheet`] (bytes to header-keyed rows),
//! [`validator`] (rows to typed records), then the reconciliation steps in
//! [`identity`], [`profile`] and [`relations`], all driven by [`engine`].
//! Results are tallied in [`report`].

pub mod descriptor;
mod engine;
mod error;
pub mod identity;
pub mod profile;
pub mod relations;
pub mod report;
pub mod sheet;
mod template;
pub mod validator;


pub use descriptor::EntityDescriptor;
pub use engine::{ImportEngine, Upload};
pub use error::ImportError;
pub use report::{BatchCounter, ImportReport, RowFailure};
pub use template::{template_csv, TEMPLATE_CONTENT_TYPE};

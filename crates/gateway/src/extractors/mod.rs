//! Custom request extractors.

mod upload;

pub use upload::ImportUpload;

//! HTTP handlers.

pub mod health_handler;
pub mod import_handler;

pub use health_handler::health_routes;
pub use import_handler::import_routes;

//! Infrastructure layer - database connection and schema migrations.

mod db;
pub mod migrations;

pub(crate) use db::ping;
pub use db::Database;
pub use migrations::Migrator;

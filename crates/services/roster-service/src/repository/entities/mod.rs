//! SeaORM entities mirroring the roster tables.

pub mod account;
pub mod account_role;
pub mod guardian_link;
pub mod profile;

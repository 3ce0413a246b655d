//! Domain layer - roster entities and value objects.
//!
//! Accounts, role tags, role profiles and guardian links, with no
//! infrastructure dependencies.

pub mod account;
pub mod constants;
pub mod error;
pub mod guardian;
pub mod password;
pub mod profile;
pub mod role;

pub use account::{Account, NewAccount};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use guardian::{GuardianLink, RelationType};
pub use password::Password;
pub use profile::{NewProfile, Profile, ProfileFields};
pub use role::Role;

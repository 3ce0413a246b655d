//! Role tags carried by accounts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ROLE_ADMIN, ROLE_GUARDIAN, ROLE_STUDENT, ROLE_TEACHER};
use crate::error::DomainError;

/// Roles an account can hold. An account may hold several at once
/// (a teacher can also be a guardian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Guardian,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Teacher, Role::Student, Role::Guardian];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Teacher => ROLE_TEACHER,
            Role::Student => ROLE_STUDENT,
            Role::Guardian => ROLE_GUARDIAN,
        }
    }

    /// Admins are tagged on the account only; every other role owns a profile row.
    pub fn has_profile(&self) -> bool {
        !matches!(self, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    /// Accepts the stored names plus the Indonesian labels used by the school.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_TEACHER | "guru" => Ok(Role::Teacher),
            ROLE_STUDENT | "santri" => Ok(Role::Student),
            ROLE_GUARDIAN | "wali" => Ok(Role::Guardian),
            other => Err(DomainError::unknown(format!("role '{}'", other))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Guardian to student relations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// How a guardian relates to a student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Father,
    Mother,
    #[default]
    Guardian,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Father => "father",
            RelationType::Mother => "mother",
            RelationType::Guardian => "guardian",
        }
    }
}

impl FromStr for RelationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "father" | "ayah" | "bapak" => Ok(RelationType::Father),
            "mother" | "ibu" => Ok(RelationType::Mother),
            "guardian" | "wali" => Ok(RelationType::Guardian),
            other => Err(DomainError::unknown(format!("relation '{}'", other))),
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link between a student profile and a guardian profile.
///
/// The pair is the identity; linking the same pair twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianLink {
    pub student_profile_id: Uuid,
    pub guardian_profile_id: Uuid,
    pub relation: RelationType,
    pub created_at: DateTime<Utc>,
}

impl GuardianLink {
    pub fn new(student_profile_id: Uuid, guardian_profile_id: Uuid, relation: RelationType) -> Self {
        Self {
            student_profile_id,
            guardian_profile_id,
            relation,
            created_at: Utc::now(),
        }
    }
}

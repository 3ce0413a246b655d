//! Login identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A login identity, keyed by its unique email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Set on accounts that still carry an import-issued default password
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Overwrite the display name. Returns `true` when it actually changed.
    pub fn rename(&mut self, name: &str) -> bool {
        if self.name == name {
            return false;
        }
        self.name = name.to_string();
        self.updated_at = Utc::now();
        true
    }

    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Data needed to insert an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub must_change_password: bool,
}

impl NewAccount {
    /// Build the account an administrative import creates. Imports are a
    /// trusted action, so the email counts as verified immediately.
    pub fn into_account(self, id: Uuid, now: DateTime<Utc>) -> Account {
        Account {
            id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            email_verified_at: Some(now),
            must_change_password: self.must_change_password,
            created_at: now,
            updated_at: now,
        }
    }
}

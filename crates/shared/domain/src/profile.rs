//! Role-specific profile attached to an account.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// Optional contact fields shared by every profile kind.
///
/// `None` means "not supplied", which never clears a stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl ProfileFields {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.address.is_none() && self.birth_date.is_none()
    }
}

/// Student, teacher or guardian record. One per (role, account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub role: Role,
    /// NIS for students, NIP for teachers, always `None` for guardians
    pub secondary_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Apply supplied fields without erasing stored ones.
    ///
    /// Returns `true` when any stored value changed.
    pub fn merge(&mut self, fields: &ProfileFields) -> bool {
        let mut changed = false;

        if let Some(phone) = &fields.phone {
            if self.phone.as_ref() != Some(phone) {
                self.phone = Some(phone.clone());
                changed = true;
            }
        }
        if let Some(address) = &fields.address {
            if self.address.as_ref() != Some(address) {
                self.address = Some(address.clone());
                changed = true;
            }
        }
        if let Some(birth_date) = fields.birth_date {
            if self.birth_date != Some(birth_date) {
                self.birth_date = Some(birth_date);
                changed = true;
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Replace the NIS/NIP. Returns `true` when it changed.
    pub fn assign_secondary_id(&mut self, secondary_id: &str) -> bool {
        if self.secondary_id.as_deref() == Some(secondary_id) {
            return false;
        }
        self.secondary_id = Some(secondary_id.to_string());
        self.updated_at = Utc::now();
        true
    }
}

/// Data needed to insert a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub account_id: Uuid,
    pub role: Role,
    pub secondary_id: Option<String>,
    pub fields: ProfileFields,
}

impl NewProfile {
    pub fn into_profile(self, id: Uuid, now: DateTime<Utc>) -> Profile {
        Profile {
            id,
            account_id: self.account_id,
            role: self.role,
            secondary_id: self.secondary_id,
            phone: self.fields.phone,
            address: self.fields.address,
            birth_date: self.fields.birth_date,
            created_at: now,
            updated_at: now,
        }
    }
}

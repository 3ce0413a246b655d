//! Profile upsert, role tagging and NIS/NIP allocation.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{Account, NewProfile, Profile, ProfileFields, Role, MAX_SECONDARY_ID_ATTEMPTS};

use super::descriptor::{EntityDescriptor, SecondaryIdSpec};
use crate::repository::RosterTx;

#[derive(Debug)]
pub struct ProfileOutcome {
    pub profile: Profile,
    pub created: bool,
    /// Any stored column changed (always true for a new profile)
    pub changed: bool,
}

/// Tag the account with `role`. Returns `true` when the tag is new.
pub async fn ensure_role(tx: &mut dyn RosterTx, account_id: Uuid, role: Role) -> AppResult<bool> {
    if tx.has_role(account_id, role).await? {
        return Ok(false);
    }
    tx.assign_role(account_id, role).await?;
    Ok(true)
}

/// Find or create the (role, account) profile and merge the supplied fields
/// into it. Blank fields never clear stored values.
pub async fn upsert_profile(
    tx: &mut dyn RosterTx,
    descriptor: &EntityDescriptor,
    account: &Account,
    supplied_id: Option<&str>,
    fields: &ProfileFields,
) -> AppResult<ProfileOutcome> {
    let existing = tx.find_profile(descriptor.role, account.id).await?;

    let secondary_id = match descriptor.secondary_id {
        Some(spec) => Some(
            allocate_secondary_id(tx, descriptor.role, &spec, existing.as_ref(), supplied_id)
                .await?,
        ),
        None => None,
    };

    match existing {
        Some(mut profile) => {
            let mut changed = profile.merge(fields);
            if let Some(id) = secondary_id.as_deref() {
                changed |= profile.assign_secondary_id(id);
            }
            if changed {
                tx.save_profile(&profile).await?;
            }
            Ok(ProfileOutcome {
                profile,
                created: false,
                changed,
            })
        }
        None => {
            let profile = tx
                .insert_profile(NewProfile {
                    account_id: account.id,
                    role: descriptor.role,
                    secondary_id,
                    fields: fields.clone(),
                })
                .await?;
            tracing::debug!(profile_id = %profile.id, role = %descriptor.role, "Profile created");
            Ok(ProfileOutcome {
                profile,
                created: true,
                changed: true,
            })
        }
    }
}

/// Pick the NIS/NIP a profile should carry.
///
/// A supplied value is adopted unless another profile of the same role holds
/// it. Failing that, an owner keeps its current value, and anyone else gets a
/// freshly generated one.
pub async fn allocate_secondary_id(
    tx: &mut dyn RosterTx,
    role: Role,
    spec: &SecondaryIdSpec,
    owner: Option<&Profile>,
    supplied: Option<&str>,
) -> AppResult<String> {
    if let Some(wanted) = supplied {
        match tx.find_profile_by_secondary_id(role, wanted).await? {
            None => return Ok(wanted.to_string()),
            Some(holder) if owner.is_some_and(|p| p.id == holder.id) => {
                return Ok(wanted.to_string())
            }
            Some(holder) => {
                tracing::warn!(
                    label = spec.label,
                    value = wanted,
                    holder = %holder.id,
                    "Supplied id already taken"
                );
            }
        }
    }

    if let Some(current) = owner.and_then(|p| p.secondary_id.clone()) {
        return Ok(current);
    }

    for _ in 0..MAX_SECONDARY_ID_ATTEMPTS {
        let candidate = generate_secondary_id(spec, Utc::now());
        if tx
            .find_profile_by_secondary_id(role, &candidate)
            .await?
            .is_none()
        {
            return Ok(candidate);
        }
    }

    tracing::error!(label = spec.label, "Could not generate a free id");
    Err(AppError::conflict(spec.label))
}

/// Timestamp prefix followed by zero-padded random digits, e.g. `2024070042`.
pub fn generate_secondary_id(spec: &SecondaryIdSpec, now: DateTime<Utc>) -> String {
    let upper = 10u32.pow(spec.random_digits);
    let suffix = rand::thread_rng().gen_range(0..upper);
    format!(
        "{}{:0width$}",
        now.format(spec.prefix_format),
        suffix,
        width = spec.random_digits as usize
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::import::identity::{resolve_account, Credential};
    use crate::repository::{MemoryRoster, UnitOfWork};

    fn credential() -> Credential {
        Credential {
            hash: "hash".to_string(),
            must_change_password: true,
        }
    }

    fn student() -> &'static EntityDescriptor {
        EntityDescriptor::for_role(Role::Student)
    }

    fn nis_spec() -> SecondaryIdSpec {
        student().secondary_id.unwrap()
    }

    async fn account(tx: &mut dyn RosterTx, email: &str) -> Account {
        resolve_account(tx, "Santri", email, &credential())
            .await
            .unwrap()
            .account
    }

    #[test]
    fn test_generated_nis_shape() {
        let now = Utc.with_ymd_and_hms(2024, 7, 9, 10, 0, 0).unwrap();
        let nis = generate_secondary_id(&nis_spec(), now);

        assert_eq!(nis.len(), 10);
        assert!(nis.starts_with("202407"));
        assert!(nis.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_nip_shape() {
        let spec = EntityDescriptor::for_role(Role::Teacher).secondary_id.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 9, 10, 0, 0).unwrap();
        let nip = generate_secondary_id(&spec, now);

        assert_eq!(nip.len(), 12);
        assert!(nip.starts_with("20240709"));
    }

    #[tokio::test]
    async fn test_ensure_role_is_idempotent() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let owner = account(tx.as_mut(), "a@x.com").await;

        assert!(ensure_role(tx.as_mut(), owner.id, Role::Student).await.unwrap());
        assert!(!ensure_role(tx.as_mut(), owner.id, Role::Student).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_merges_without_erasing() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let owner = account(tx.as_mut(), "a@x.com").await;

        let first = ProfileFields {
            phone: Some("0812".to_string()),
            address: Some("Jl. Lama".to_string()),
            birth_date: NaiveDate::from_ymd_opt(2012, 1, 1),
        };
        let created = upsert_profile(tx.as_mut(), student(), &owner, Some("2024010001"), &first)
            .await
            .unwrap();
        assert!(created.created);

        let second = ProfileFields {
            address: Some("Jl. Baru".to_string()),
            ..Default::default()
        };
        let updated = upsert_profile(tx.as_mut(), student(), &owner, None, &second)
            .await
            .unwrap();

        assert!(!updated.created && updated.changed);
        assert_eq!(updated.profile.id, created.profile.id);
        assert_eq!(updated.profile.phone.as_deref(), Some("0812"));
        assert_eq!(updated.profile.address.as_deref(), Some("Jl. Baru"));
        assert_eq!(updated.profile.secondary_id.as_deref(), Some("2024010001"));

        let again = upsert_profile(tx.as_mut(), student(), &owner, None, &second)
            .await
            .unwrap();
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn test_taken_id_is_not_adopted() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let first = account(tx.as_mut(), "a@x.com").await;
        let second = account(tx.as_mut(), "b@x.com").await;
        let fields = ProfileFields::default();

        upsert_profile(tx.as_mut(), student(), &first, Some("2024010001"), &fields)
            .await
            .unwrap();
        let other = upsert_profile(tx.as_mut(), student(), &second, Some("2024010001"), &fields)
            .await
            .unwrap();

        let nis = other.profile.secondary_id.unwrap();
        assert_ne!(nis, "2024010001");
        assert_eq!(nis.len(), 10);
    }

    #[tokio::test]
    async fn test_owner_keeps_id_when_supplied_one_is_taken() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let first = account(tx.as_mut(), "a@x.com").await;
        let second = account(tx.as_mut(), "b@x.com").await;
        let fields = ProfileFields::default();

        upsert_profile(tx.as_mut(), student(), &first, Some("1111"), &fields)
            .await
            .unwrap();
        upsert_profile(tx.as_mut(), student(), &second, Some("2222"), &fields)
            .await
            .unwrap();
        let outcome = upsert_profile(tx.as_mut(), student(), &second, Some("1111"), &fields)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.profile.secondary_id.as_deref(), Some("2222"));
    }

    #[tokio::test]
    async fn test_guardian_profiles_have_no_secondary_id() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let owner = account(tx.as_mut(), "wali@x.com").await;

        let outcome = upsert_profile(
            tx.as_mut(),
            EntityDescriptor::for_role(Role::Guardian),
            &owner,
            Some("ignored"),
            &ProfileFields::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.profile.secondary_id, None);
    }
}

//! Guardian links for student rows.
//!
//! Guardians come from two places on a row: the `guardian_emails` list, which
//! may only point at guardians that already exist, and the inline guardian
//! columns, which may create one. Links are only ever added.

use std::collections::BTreeSet;

use uuid::Uuid;

use common::AppResult;
use domain::{GuardianLink, Profile, ProfileFields, Role};

use super::descriptor::EntityDescriptor;
use super::identity::{resolve_account, Credential};
use super::profile::{ensure_role, upsert_profile};
use super::validator::{InlineGuardian, RowRecord};
use crate::repository::RosterTx;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutcome {
    pub guardians_created: usize,
    pub links_added: usize,
}

pub async fn sync_guardians(
    tx: &mut dyn RosterTx,
    student: &Profile,
    record: &RowRecord,
    credential: &Credential,
) -> AppResult<LinkOutcome> {
    let mut outcome = LinkOutcome::default();
    let mut wanted: BTreeSet<Uuid> = BTreeSet::new();

    for email in &record.guardian_emails {
        match existing_guardian(tx, email).await? {
            Some(profile) => {
                wanted.insert(profile.id);
            }
            None => tracing::debug!(row = record.row, email = %email, "Unknown guardian email skipped"),
        }
    }

    if let Some(inline) = &record.guardian {
        let (profile, created) = inline_guardian(tx, inline, credential).await?;
        if created {
            outcome.guardians_created += 1;
        }
        if let Some(profile) = profile {
            wanted.insert(profile.id);
        }
    }

    let linked: BTreeSet<Uuid> = tx.guardian_ids_of(student.id).await?.into_iter().collect();
    for guardian_id in wanted.difference(&linked) {
        tx.link_guardian(GuardianLink::new(student.id, *guardian_id, record.relation))
            .await?;
        outcome.links_added += 1;
    }

    Ok(outcome)
}

async fn existing_guardian(tx: &mut dyn RosterTx, email: &str) -> AppResult<Option<Profile>> {
    match tx.find_account_by_email(email).await? {
        Some(account) => tx.find_profile(Role::Guardian, account.id).await,
        None => Ok(None),
    }
}

/// Resolve the inline guardian. Returns the guardian profile to link, if any,
/// and whether a new guardian was created.
async fn inline_guardian(
    tx: &mut dyn RosterTx,
    inline: &InlineGuardian,
    credential: &Credential,
) -> AppResult<(Option<Profile>, bool)> {
    let fields = ProfileFields {
        phone: inline.phone.clone(),
        address: inline.address.clone(),
        birth_date: None,
    };
    let descriptor = EntityDescriptor::for_role(Role::Guardian);

    if let Some(account) = tx.find_account_by_email(&inline.email).await? {
        // Someone else's account (a teacher, say) is never turned into a guardian
        if tx.find_profile(Role::Guardian, account.id).await?.is_none() {
            tracing::debug!(account_id = %account.id, "Inline guardian email belongs to a non-guardian");
            return Ok((None, false));
        }
        let resolution = resolve_account(tx, &inline.name, &inline.email, credential).await?;
        let outcome = upsert_profile(tx, descriptor, &resolution.account, None, &fields).await?;
        return Ok((Some(outcome.profile), false));
    }

    let resolution = resolve_account(tx, &inline.name, &inline.email, credential).await?;
    ensure_role(tx, resolution.account.id, Role::Guardian).await?;
    let outcome = upsert_profile(tx, descriptor, &resolution.account, None, &fields).await?;
    tracing::info!(account_id = %resolution.account.id, "Guardian created from student row");

    Ok((Some(outcome.profile), true))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::repository::{MemoryRoster, UnitOfWork};
    use domain::RelationType;

    fn credential() -> Credential {
        Credential {
            hash: "hash".to_string(),
            must_change_password: true,
        }
    }

    fn record(guardian_emails: &[&str], guardian: Option<InlineGuardian>) -> RowRecord {
        RowRecord {
            row: 2,
            name: "Ahmad".to_string(),
            email: Some("ahmad@x.com".to_string()),
            secondary_id: None,
            fields: ProfileFields {
                birth_date: NaiveDate::from_ymd_opt(2012, 1, 1),
                ..Default::default()
            },
            guardian_emails: guardian_emails.iter().map(|e| e.to_string()).collect(),
            guardian,
            relation: RelationType::Mother,
        }
    }

    async fn profile_for(tx: &mut dyn RosterTx, role: Role, email: &str) -> Profile {
        let account = resolve_account(tx, "Someone", email, &credential())
            .await
            .unwrap()
            .account;
        ensure_role(tx, account.id, role).await.unwrap();
        upsert_profile(
            tx,
            EntityDescriptor::for_role(role),
            &account,
            None,
            &ProfileFields::default(),
        )
        .await
        .unwrap()
        .profile
    }

    #[tokio::test]
    async fn test_links_known_guardians_and_skips_unknown() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let student = profile_for(tx.as_mut(), Role::Student, "ahmad@x.com").await;
        let siti = profile_for(tx.as_mut(), Role::Guardian, "siti@x.com").await;

        let outcome = sync_guardians(
            tx.as_mut(),
            &student,
            &record(&["siti@x.com", "nobody@x.com"], None),
            &credential(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome, LinkOutcome { guardians_created: 0, links_added: 1 });
        let links = roster.links_of(student.id);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].guardian_profile_id, siti.id);
        assert_eq!(links[0].relation, RelationType::Mother);
    }

    #[tokio::test]
    async fn test_union_with_inline_guardian_is_additive() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let student = profile_for(tx.as_mut(), Role::Student, "ahmad@x.com").await;
        profile_for(tx.as_mut(), Role::Guardian, "siti@x.com").await;

        let inline = InlineGuardian {
            name: "Budi".to_string(),
            email: "budi@x.com".to_string(),
            phone: Some("0812".to_string()),
            address: None,
        };
        let row = record(&["siti@x.com"], Some(inline));

        let first = sync_guardians(tx.as_mut(), &student, &row, &credential())
            .await
            .unwrap();
        let second = sync_guardians(tx.as_mut(), &student, &row, &credential())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, LinkOutcome { guardians_created: 1, links_added: 2 });
        assert_eq!(second, LinkOutcome::default());
        assert_eq!(roster.links_of(student.id).len(), 2);
        let budi = roster.account_by_email("budi@x.com").unwrap();
        assert_eq!(roster.roles_of(budi.id), vec![Role::Guardian]);
    }

    #[tokio::test]
    async fn test_inline_guardian_on_teacher_account_contributes_nothing() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let student = profile_for(tx.as_mut(), Role::Student, "ahmad@x.com").await;
        profile_for(tx.as_mut(), Role::Teacher, "hasan@x.com").await;

        let inline = InlineGuardian {
            name: "Hasan".to_string(),
            email: "hasan@x.com".to_string(),
            phone: None,
            address: None,
        };
        let outcome = sync_guardians(tx.as_mut(), &student, &record(&[], Some(inline)), &credential())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome, LinkOutcome::default());
        assert!(roster.profile_by_email(Role::Guardian, "hasan@x.com").is_none());
    }

    #[tokio::test]
    async fn test_existing_inline_guardian_is_merged() {
        let roster = MemoryRoster::new();
        let mut tx = roster.begin().await.unwrap();
        let student = profile_for(tx.as_mut(), Role::Student, "ahmad@x.com").await;
        profile_for(tx.as_mut(), Role::Guardian, "budi@x.com").await;

        let inline = InlineGuardian {
            name: "Budi Santoso".to_string(),
            email: "budi@x.com".to_string(),
            phone: Some("0812".to_string()),
            address: None,
        };
        let outcome = sync_guardians(tx.as_mut(), &student, &record(&[], Some(inline)), &credential())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome, LinkOutcome { guardians_created: 0, links_added: 1 });
        assert_eq!(roster.account_by_email("budi@x.com").unwrap().name, "Budi Santoso");
        let guardian = roster.profile_by_email(Role::Guardian, "budi@x.com").unwrap();
        assert_eq!(guardian.phone.as_deref(), Some("0812"));
    }
}

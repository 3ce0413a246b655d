//! SeaORM implementation of the roster unit of work.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, IsolationLevel, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::entities::{account, account_role, guardian_link, profile};
use super::unit_of_work::{RosterTx, UnitOfWork};
use crate::infra;
use common::{AppError, AppResult, OptionExt};
use domain::{Account, GuardianLink, NewAccount, NewProfile, Profile, Role};

/// Postgres-backed roster storage.
pub struct RosterStore {
    db: DatabaseConnection,
}

impl RosterStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UnitOfWork for RosterStore {
    async fn begin(&self) -> AppResult<Box<dyn RosterTx>> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        Ok(Box::new(SeaTx { txn }))
    }

    async fn ping(&self) -> AppResult<()> {
        infra::ping(&self.db).await.map_err(AppError::from)
    }
}

/// Unique-constraint violations become conflicts so the row report names
/// what collided instead of a generic database error.
fn write_error(err: DbErr, entity: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(entity),
        _ => AppError::from(err),
    }
}

/// One open database transaction.
struct SeaTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl RosterTx for SeaTx {
    async fn find_account(&mut self, id: Uuid) -> AppResult<Option<Account>> {
        let result = account::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Account::from))
    }

    async fn find_account_by_email(&mut self, email: &str) -> AppResult<Option<Account>> {
        let result = account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Account::from))
    }

    async fn create_account(&mut self, new: NewAccount) -> AppResult<Account> {
        let account = new.into_account(Uuid::new_v4(), Utc::now());
        let active_model = account::ActiveModel {
            id: Set(account.id),
            email: Set(account.email.clone()),
            name: Set(account.name.clone()),
            password_hash: Set(account.password_hash.clone()),
            email_verified_at: Set(account.email_verified_at),
            must_change_password: Set(account.must_change_password),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        };

        let model = active_model
            .insert(&self.txn)
            .await
            .map_err(|e| write_error(e, "Email"))?;
        Ok(Account::from(model))
    }

    async fn rename_account(&mut self, id: Uuid, name: &str) -> AppResult<()> {
        let model = account::Entity::find_by_id(id)
            .one(&self.txn)
            .await?
            .ok_or_not_found()?;

        let mut active: account::ActiveModel = model.into();
        active.name = Set(name.to_string());
        active.updated_at = Set(Utc::now());

        active.update(&self.txn).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn has_role(&mut self, account_id: Uuid, role: Role) -> AppResult<bool> {
        let result = account_role::Entity::find_by_id((account_id, role.as_str().to_string()))
            .one(&self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.is_some())
    }

    async fn assign_role(&mut self, account_id: Uuid, role: Role) -> AppResult<()> {
        let active_model = account_role::ActiveModel {
            account_id: Set(account_id),
            role: Set(role.as_str().to_string()),
        };

        account_role::Entity::insert(active_model)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| write_error(e, "Role"))?;
        Ok(())
    }

    async fn find_profile(&mut self, role: Role, account_id: Uuid) -> AppResult<Option<Profile>> {
        profile::Entity::find()
            .filter(profile::Column::Role.eq(role.as_str()))
            .filter(profile::Column::AccountId.eq(account_id))
            .one(&self.txn)
            .await
            .map_err(AppError::from)?
            .map(Profile::try_from)
            .transpose()
    }

    async fn find_profile_by_secondary_id(
        &mut self,
        role: Role,
        secondary_id: &str,
    ) -> AppResult<Option<Profile>> {
        profile::Entity::find()
            .filter(profile::Column::Role.eq(role.as_str()))
            .filter(profile::Column::SecondaryId.eq(secondary_id))
            .one(&self.txn)
            .await
            .map_err(AppError::from)?
            .map(Profile::try_from)
            .transpose()
    }

    async fn find_placeholder_holder(
        &mut self,
        role: Role,
        name: &str,
        birth_date: NaiveDate,
        email_domain: &str,
    ) -> AppResult<Option<(Account, Profile)>> {
        let accounts = account::Entity::find()
            .filter(account::Column::Name.eq(name))
            .filter(account::Column::Email.like(format!("%@{}", email_domain)))
            .order_by_asc(account::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(AppError::from)?;
        if accounts.is_empty() {
            return Ok(None);
        }

        let profiles = profile::Entity::find()
            .filter(profile::Column::Role.eq(role.as_str()))
            .filter(profile::Column::BirthDate.eq(birth_date))
            .filter(profile::Column::AccountId.is_in(accounts.iter().map(|a| a.id)))
            .all(&self.txn)
            .await
            .map_err(AppError::from)?;

        for model in accounts {
            if let Some(found) = profiles.iter().find(|p| p.account_id == model.id) {
                let profile = Profile::try_from(found.clone())?;
                return Ok(Some((Account::from(model), profile)));
            }
        }
        Ok(None)
    }

    async fn insert_profile(&mut self, new: NewProfile) -> AppResult<Profile> {
        let profile = new.into_profile(Uuid::new_v4(), Utc::now());
        let active_model = profile::ActiveModel {
            id: Set(profile.id),
            account_id: Set(profile.account_id),
            role: Set(profile.role.as_str().to_string()),
            secondary_id: Set(profile.secondary_id.clone()),
            phone: Set(profile.phone.clone()),
            address: Set(profile.address.clone()),
            birth_date: Set(profile.birth_date),
            created_at: Set(profile.created_at),
            updated_at: Set(profile.updated_at),
        };

        active_model
            .insert(&self.txn)
            .await
            .map_err(|e| write_error(e, "Profile"))?;
        Ok(profile)
    }

    async fn save_profile(&mut self, profile: &Profile) -> AppResult<()> {
        let model = profile::Entity::find_by_id(profile.id)
            .one(&self.txn)
            .await?
            .ok_or_not_found()?;

        let mut active: profile::ActiveModel = model.into();
        active.secondary_id = Set(profile.secondary_id.clone());
        active.phone = Set(profile.phone.clone());
        active.address = Set(profile.address.clone());
        active.birth_date = Set(profile.birth_date);
        active.updated_at = Set(profile.updated_at);

        active
            .update(&self.txn)
            .await
            .map_err(|e| write_error(e, "Profile"))?;
        Ok(())
    }

    async fn guardian_ids_of(&mut self, student_profile_id: Uuid) -> AppResult<Vec<Uuid>> {
        let links = guardian_link::Entity::find()
            .filter(guardian_link::Column::StudentProfileId.eq(student_profile_id))
            .all(&self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(links.into_iter().map(|l| l.guardian_profile_id).collect())
    }

    async fn link_guardian(&mut self, link: GuardianLink) -> AppResult<()> {
        let active_model = guardian_link::ActiveModel {
            student_profile_id: Set(link.student_profile_id),
            guardian_profile_id: Set(link.guardian_profile_id),
            relation: Set(link.relation.as_str().to_string()),
            created_at: Set(link.created_at),
        };

        guardian_link::Entity::insert(active_model)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| write_error(e, "Guardian link"))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await.map_err(AppError::from)
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.txn.rollback().await.map_err(AppError::from)
    }
}

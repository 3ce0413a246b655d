//! In-memory unit of work for tests.
//!
//! Each transaction works on a snapshot of the shared state and publishes it
//! back on commit, so rolled-back rows leave no trace. The same unique
//! constraints as the database schema are enforced on write.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::DbErr;
use uuid::Uuid;

use super::unit_of_work::{RosterTx, UnitOfWork};
use common::{AppError, AppResult, OptionExt};
use domain::{Account, GuardianLink, NewAccount, NewProfile, Profile, Role};

#[derive(Debug, Clone, Default)]
struct RosterState {
    accounts: BTreeMap<Uuid, Account>,
    roles: BTreeSet<(Uuid, Role)>,
    profiles: BTreeMap<Uuid, Profile>,
    links: BTreeMap<(Uuid, Uuid), GuardianLink>,
}

impl RosterState {
    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.email == email)
    }

    fn profile_where(&self, predicate: impl Fn(&Profile) -> bool) -> Option<&Profile> {
        self.profiles.values().find(|p| predicate(p))
    }

    fn secondary_id_taken(&self, role: Role, secondary_id: &str, except: Option<Uuid>) -> bool {
        self.profiles.values().any(|p| {
            p.role == role
                && p.secondary_id.as_deref() == Some(secondary_id)
                && Some(p.id) != except
        })
    }
}

/// Roster storage kept in process memory.
#[derive(Default)]
pub struct MemoryRoster {
    state: Arc<Mutex<RosterState>>,
    failing_emails: Arc<Mutex<HashSet<String>>>,
    unavailable: Mutex<bool>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any account insert for `email` fail like a dropped connection.
    pub fn fail_writes_for(&self, email: &str) {
        lock(&self.failing_emails).insert(email.to_string());
    }

    /// Make `begin` and `ping` fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    pub fn account_by_email(&self, email: &str) -> Option<Account> {
        lock(&self.state).account_by_email(email).cloned()
    }

    pub fn accounts(&self) -> Vec<Account> {
        lock(&self.state).accounts.values().cloned().collect()
    }

    pub fn roles_of(&self, account_id: Uuid) -> Vec<Role> {
        lock(&self.state)
            .roles
            .iter()
            .filter(|(id, _)| *id == account_id)
            .map(|(_, role)| *role)
            .collect()
    }

    pub fn profiles(&self, role: Role) -> Vec<Profile> {
        lock(&self.state)
            .profiles
            .values()
            .filter(|p| p.role == role)
            .cloned()
            .collect()
    }

    /// Profile of `role` owned by the account registered under `email`.
    pub fn profile_by_email(&self, role: Role, email: &str) -> Option<Profile> {
        let state = lock(&self.state);
        let account_id = state.account_by_email(email)?.id;
        state
            .profile_where(|p| p.role == role && p.account_id == account_id)
            .cloned()
    }

    pub fn links_of(&self, student_profile_id: Uuid) -> Vec<GuardianLink> {
        lock(&self.state)
            .links
            .values()
            .filter(|l| l.student_profile_id == student_profile_id)
            .cloned()
            .collect()
    }

    pub fn link_count(&self) -> usize {
        lock(&self.state).links.len()
    }
}

#[async_trait]
impl UnitOfWork for MemoryRoster {
    async fn begin(&self) -> AppResult<Box<dyn RosterTx>> {
        if *lock(&self.unavailable) {
            return Err(AppError::from(DbErr::Custom(
                "memory roster offline".to_string(),
            )));
        }

        let working = lock(&self.state).clone();
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.state),
            failing_emails: Arc::clone(&self.failing_emails),
            working,
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        if *lock(&self.unavailable) {
            return Err(AppError::ServiceUnavailable("database".to_string()));
        }
        Ok(())
    }
}

struct MemoryTx {
    shared: Arc<Mutex<RosterState>>,
    failing_emails: Arc<Mutex<HashSet<String>>>,
    working: RosterState,
}

#[async_trait]
impl RosterTx for MemoryTx {
    async fn find_account(&mut self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&mut self, email: &str) -> AppResult<Option<Account>> {
        Ok(self.working.account_by_email(email).cloned())
    }

    async fn create_account(&mut self, new: NewAccount) -> AppResult<Account> {
        if lock(&self.failing_emails).contains(&new.email) {
            return Err(AppError::from(DbErr::Custom(format!(
                "connection reset while inserting {}",
                new.email
            ))));
        }
        if self.working.account_by_email(&new.email).is_some() {
            return Err(AppError::conflict("Email"));
        }

        let account = new.into_account(Uuid::new_v4(), Utc::now());
        self.working.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn rename_account(&mut self, id: Uuid, name: &str) -> AppResult<()> {
        let account = self.working.accounts.get_mut(&id).ok_or_not_found()?;
        account.rename(name);
        Ok(())
    }

    async fn has_role(&mut self, account_id: Uuid, role: Role) -> AppResult<bool> {
        Ok(self.working.roles.contains(&(account_id, role)))
    }

    async fn assign_role(&mut self, account_id: Uuid, role: Role) -> AppResult<()> {
        if !self.working.roles.insert((account_id, role)) {
            return Err(AppError::conflict("Role"));
        }
        Ok(())
    }

    async fn find_profile(&mut self, role: Role, account_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self
            .working
            .profile_where(|p| p.role == role && p.account_id == account_id)
            .cloned())
    }

    async fn find_profile_by_secondary_id(
        &mut self,
        role: Role,
        secondary_id: &str,
    ) -> AppResult<Option<Profile>> {
        Ok(self
            .working
            .profile_where(|p| p.role == role && p.secondary_id.as_deref() == Some(secondary_id))
            .cloned())
    }

    async fn find_placeholder_holder(
        &mut self,
        role: Role,
        name: &str,
        birth_date: NaiveDate,
        email_domain: &str,
    ) -> AppResult<Option<(Account, Profile)>> {
        let suffix = format!("@{}", email_domain);
        let found = self
            .working
            .accounts
            .values()
            .filter(|a| a.name == name && a.email.ends_with(&suffix))
            .filter_map(|account| {
                self.working
                    .profile_where(|p| {
                        p.role == role
                            && p.account_id == account.id
                            && p.birth_date == Some(birth_date)
                    })
                    .map(|profile| (account.clone(), profile.clone()))
            })
            .min_by_key(|(account, _)| account.created_at);
        Ok(found)
    }

    async fn insert_profile(&mut self, new: NewProfile) -> AppResult<Profile> {
        let duplicate = self
            .working
            .profile_where(|p| p.role == new.role && p.account_id == new.account_id)
            .is_some();
        let id_taken = new
            .secondary_id
            .as_deref()
            .is_some_and(|id| self.working.secondary_id_taken(new.role, id, None));
        if duplicate || id_taken {
            return Err(AppError::conflict("Profile"));
        }

        let profile = new.into_profile(Uuid::new_v4(), Utc::now());
        self.working.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn save_profile(&mut self, profile: &Profile) -> AppResult<()> {
        if let Some(id) = profile.secondary_id.as_deref() {
            if self
                .working
                .secondary_id_taken(profile.role, id, Some(profile.id))
            {
                return Err(AppError::conflict("Profile"));
            }
        }

        let stored = self.working.profiles.get_mut(&profile.id).ok_or_not_found()?;
        *stored = profile.clone();
        Ok(())
    }

    async fn guardian_ids_of(&mut self, student_profile_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .working
            .links
            .keys()
            .filter(|(student, _)| *student == student_profile_id)
            .map(|(_, guardian)| *guardian)
            .collect())
    }

    async fn link_guardian(&mut self, link: GuardianLink) -> AppResult<()> {
        let key = (link.student_profile_id, link.guardian_profile_id);
        if self.working.links.contains_key(&key) {
            return Err(AppError::conflict("Guardian link"));
        }
        self.working.links.insert(key, link);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            shared, working, ..
        } = *self;
        *lock(&shared) = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

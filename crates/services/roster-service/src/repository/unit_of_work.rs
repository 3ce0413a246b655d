//! Unit of Work for roster imports.
//!
//! Every spreadsheet row is reconciled inside its own transaction. The engine
//! asks the unit of work for a fresh [`RosterTx`], performs all reads and
//! writes for that row through it, then either commits or rolls back. A
//! failure in one row therefore never undoes rows that came before it.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use common::AppResult;
use domain::{Account, GuardianLink, NewAccount, NewProfile, Profile, Role};

/// Hands out per-row transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Open a read-committed, read-write transaction.
    async fn begin(&self) -> AppResult<Box<dyn RosterTx>>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> AppResult<()>;
}

/// Roster reads and writes scoped to one open transaction.
///
/// Nothing written through this handle is visible to other transactions until
/// [`RosterTx::commit`] succeeds. Dropping the handle without committing
/// discards the writes.
#[async_trait]
pub trait RosterTx: Send {
    // =========================================================================
    // Accounts
    // =========================================================================

    async fn find_account(&mut self, id: Uuid) -> AppResult<Option<Account>>;

    /// Exact, case-sensitive match on the stored email.
    async fn find_account_by_email(&mut self, email: &str) -> AppResult<Option<Account>>;

    /// Insert an account. Fails with a conflict when the email is taken.
    async fn create_account(&mut self, account: NewAccount) -> AppResult<Account>;

    async fn rename_account(&mut self, id: Uuid, name: &str) -> AppResult<()>;

    // =========================================================================
    // Role tags
    // =========================================================================

    async fn has_role(&mut self, account_id: Uuid, role: Role) -> AppResult<bool>;

    async fn assign_role(&mut self, account_id: Uuid, role: Role) -> AppResult<()>;

    // =========================================================================
    // Profiles
    // =========================================================================

    async fn find_profile(&mut self, role: Role, account_id: Uuid) -> AppResult<Option<Profile>>;

    async fn find_profile_by_secondary_id(
        &mut self,
        role: Role,
        secondary_id: &str,
    ) -> AppResult<Option<Profile>>;

    /// Oldest profile whose account carries a placeholder email on
    /// `email_domain` and matches `name` and `birth_date` exactly.
    async fn find_placeholder_holder(
        &mut self,
        role: Role,
        name: &str,
        birth_date: NaiveDate,
        email_domain: &str,
    ) -> AppResult<Option<(Account, Profile)>>;

    /// Insert a profile. Fails with a conflict when the account already has a
    /// profile for this role or the NIS/NIP is taken.
    async fn insert_profile(&mut self, profile: NewProfile) -> AppResult<Profile>;

    /// Persist the mutable columns of an existing profile.
    async fn save_profile(&mut self, profile: &Profile) -> AppResult<()>;

    // =========================================================================
    // Guardian links
    // =========================================================================

    async fn guardian_ids_of(&mut self, student_profile_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn link_guardian(&mut self, link: GuardianLink) -> AppResult<()>;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

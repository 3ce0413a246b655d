//! Identity resolution: find the account behind an email or create it.

use common::AppResult;
use domain::{Account, NewAccount};

use crate::repository::RosterTx;

/// Password applied to accounts created by an import.
#[derive(Clone)]
pub struct Credential {
    pub hash: String,
    pub must_change_password: bool,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("hash", &"[REDACTED]")
            .field("must_change_password", &self.must_change_password)
            .finish()
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub account: Account,
    pub created: bool,
    pub renamed: bool,
}

/// Look the account up by exact email. An existing account takes the imported
/// name; a missing one is created verified, with the import credential.
pub async fn resolve_account(
    tx: &mut dyn RosterTx,
    name: &str,
    email: &str,
    credential: &Credential,
) -> AppResult<Resolution> {
    if let Some(mut account) = tx.find_account_by_email(email).await? {
        let renamed = account.rename(name);
        if renamed {
            tx.rename_account(account.id, name).await?;
        }
        return Ok(Resolution {
            account,
            created: false,
            renamed,
        });
    }

    let account = tx
        .create_account(NewAccount {
            email: email.to_string(),
            name: name.to_string(),
            password_hash: credential.hash.clone(),
            must_change_password: credential.must_change_password,
        })
        .await?;

    tracing::debug!(account_id = %account.id, "Account created");

    Ok(Resolution {
        account,
        created: true,
        renamed: false,
    })
}

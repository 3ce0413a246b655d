//! The import loop.
//!
//! File-level checks run first and abort the whole import. After that every
//! non-blank row is validated, then reconciled inside its own transaction.
//! Counters only move once a row's transaction has committed.

use std::sync::Arc;

use common::{AppError, AppResult, ImportConfig};
use domain::{Password, Role};

use super::descriptor::EntityDescriptor;
use super::error::ImportError;
use super::identity::{resolve_account, Credential, Resolution};
use super::profile::{allocate_secondary_id, ensure_role, upsert_profile};
use super::relations::sync_guardians;
use super::report::{BatchCounter, ImportReport, RowFailure, RowOutcome, RowStatus};
use super::sheet::{read_sheet, SheetFormat};
use super::validator::{RowRecord, RowValidator};
use crate::repository::{RosterTx, UnitOfWork};

/// An uploaded spreadsheet plus the form fields sent with it.
#[derive(Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Password for admin imports
    pub password: Option<String>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

pub struct ImportEngine {
    uow: Arc<dyn UnitOfWork>,
    config: ImportConfig,
}

impl ImportEngine {
    pub fn new(uow: Arc<dyn UnitOfWork>, config: ImportConfig) -> Self {
        Self { uow, config }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.uow.ping().await
    }

    /// Import every row of `upload` as `kind`.
    pub async fn import(&self, kind: Role, upload: Upload) -> Result<ImportReport, ImportError> {
        let descriptor = EntityDescriptor::for_role(kind);

        if upload.bytes.len() > descriptor.max_upload_bytes {
            return Err(ImportError::TooLarge {
                size: upload.bytes.len(),
                limit: descriptor.max_upload_bytes,
            });
        }

        let format = SheetFormat::detect(
            upload.file_name.as_deref(),
            upload.content_type.as_deref(),
            &upload.bytes,
        )
        .ok_or(ImportError::UnsupportedFormat)?;

        let credential = self.credential(kind, upload.password.as_deref())?;

        let sheet = read_sheet(format, &upload.bytes)?;
        let missing = descriptor.missing_columns(&sheet.headers);
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        tracing::info!(
            kind = %kind,
            rows = sheet.rows.len(),
            file = upload.file_name.as_deref().unwrap_or("-"),
            "Import started"
        );

        let validator = RowValidator::new(descriptor);
        let mut counter = BatchCounter::new(descriptor);

        for raw in &sheet.rows {
            if raw.is_blank() {
                continue;
            }

            let record = match validator.validate(raw) {
                Ok(record) => record,
                Err(failures) => {
                    tracing::debug!(row = raw.number, failures = failures.len(), "Row rejected");
                    counter.fail(failures);
                    continue;
                }
            };

            match self.process_row(descriptor, &record, &credential).await {
                Ok(outcome) => counter.record(outcome),
                Err(e) => {
                    tracing::warn!(row = raw.number, error = %e, "Row rolled back");
                    counter.fail([RowFailure {
                        row: raw.number,
                        attribute: None,
                        errors: vec![format!("Gagal menyimpan data: {}", e.user_message())],
                        values: raw.values(),
                    }]);
                }
            }
        }

        let report = counter.into_report();
        tracing::info!(
            kind = %kind,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed_rows = report.failed_rows(),
            "Import finished"
        );
        Ok(report)
    }

    /// Hash the batch password once. Admin imports bring their own; every
    /// other kind gets the configured default and must change it on login.
    fn credential(&self, kind: Role, supplied: Option<&str>) -> Result<Credential, ImportError> {
        if kind.is_admin() {
            let plain = supplied
                .filter(|p| !p.is_empty())
                .ok_or(ImportError::MissingPassword)?;
            let password =
                Password::new(plain).map_err(|e| ImportError::InvalidPassword(e.to_string()))?;
            return Ok(Credential {
                hash: password.into_string(),
                must_change_password: false,
            });
        }

        let password = Password::new(&self.config.default_password)
            .map_err(|e| ImportError::Setup(e.to_string()))?;
        Ok(Credential {
            hash: password.into_string(),
            must_change_password: true,
        })
    }

    async fn process_row(
        &self,
        descriptor: &'static EntityDescriptor,
        record: &RowRecord,
        credential: &Credential,
    ) -> AppResult<RowOutcome> {
        let mut tx = self.uow.begin().await?;

        let result = self.reconcile(tx.as_mut(), descriptor, record, credential).await;
        match result {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn reconcile(
        &self,
        tx: &mut dyn RosterTx,
        descriptor: &'static EntityDescriptor,
        record: &RowRecord,
        credential: &Credential,
    ) -> AppResult<RowOutcome> {
        if descriptor.role.is_admin() {
            let email = record.email.as_deref().unwrap_or_default();
            let resolution = resolve_account(tx, &record.name, email, credential).await?;
            let role_added = ensure_role(tx, resolution.account.id, Role::Admin).await?;
            let status = if role_added {
                RowStatus::Created
            } else if resolution.renamed {
                RowStatus::Updated
            } else {
                RowStatus::Unchanged
            };
            return Ok(RowOutcome {
                status,
                guardians_created: 0,
                guardians_linked: 0,
            });
        }

        let (resolution, secondary_id) =
            self.resolve_holder(tx, descriptor, record, credential).await?;
        let role_added = ensure_role(tx, resolution.account.id, descriptor.role).await?;
        let profile = upsert_profile(
            tx,
            descriptor,
            &resolution.account,
            secondary_id.as_deref(),
            &record.fields,
        )
        .await?;

        let status = if profile.created {
            RowStatus::Created
        } else if profile.changed || resolution.renamed || role_added {
            RowStatus::Updated
        } else {
            RowStatus::Unchanged
        };

        let links = if descriptor.links_guardians {
            sync_guardians(tx, &profile.profile, record, credential).await?
        } else {
            Default::default()
        };

        Ok(RowOutcome {
            status,
            guardians_created: links.guardians_created,
            guardians_linked: links.links_added,
        })
    }

    /// Account that owns the row's profile, plus the NIS/NIP to offer the
    /// profile. Students without an email are found through their NIS, or
    /// given a placeholder address built from it.
    async fn resolve_holder(
        &self,
        tx: &mut dyn RosterTx,
        descriptor: &'static EntityDescriptor,
        record: &RowRecord,
        credential: &Credential,
    ) -> AppResult<(Resolution, Option<String>)> {
        if let Some(email) = record.email.as_deref() {
            let resolution = resolve_account(tx, &record.name, email, credential).await?;
            return Ok((resolution, record.secondary_id.clone()));
        }

        let spec = match descriptor.secondary_id {
            Some(spec) if descriptor.email_optional => spec,
            // Validation requires an email for every other kind
            _ => return Err(AppError::validation("email wajib diisi")),
        };

        if let Some(nis) = record.secondary_id.as_deref() {
            if let Some(profile) = tx.find_profile_by_secondary_id(descriptor.role, nis).await? {
                if let Some(mut account) = tx.find_account(profile.account_id).await? {
                    let renamed = account.rename(&record.name);
                    if renamed {
                        tx.rename_account(account.id, &record.name).await?;
                    }
                    let resolution = Resolution {
                        account,
                        created: false,
                        renamed,
                    };
                    return Ok((resolution, Some(nis.to_string())));
                }
            }
        }

        // Without an email or a NIS, a re-imported row is recognised by the
        // placeholder account created for it the first time.
        if record.secondary_id.is_none() {
            if let Some(birth_date) = record.fields.birth_date {
                let existing = tx
                    .find_placeholder_holder(
                        descriptor.role,
                        &record.name,
                        birth_date,
                        &self.config.placeholder_email_domain,
                    )
                    .await?;
                if let Some((account, profile)) = existing {
                    tracing::debug!(
                        row = record.row,
                        email = %account.email,
                        "Placeholder account reused"
                    );
                    let resolution = Resolution {
                        account,
                        created: false,
                        renamed: false,
                    };
                    return Ok((resolution, profile.secondary_id));
                }
            }
        }

        let nis = allocate_secondary_id(
            tx,
            descriptor.role,
            &spec,
            None,
            record.secondary_id.as_deref(),
        )
        .await?;
        let email = format!("{}@{}", nis, self.config.placeholder_email_domain);
        tracing::debug!(row = record.row, email = %email, "Placeholder email assigned");

        let resolution = resolve_account(tx, &record.name, &email, credential).await?;
        Ok((resolution, Some(nis)))
    }
}

//! Roster service - the entry point the gateway and CLI call into.

use std::sync::Arc;

use async_trait::async_trait;

use common::{AppResult, ImportConfig};
use domain::Role;

use crate::import::{
    template_csv, EntityDescriptor, ImportEngine, ImportReport, Upload, TEMPLATE_CONTENT_TYPE,
};
use crate::repository::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Downloadable example spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Roster operations for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RosterService: Send + Sync {
    /// Import one spreadsheet of `kind` records.
    ///
    /// Whole-file problems come back as errors. Row problems are listed in the
    /// report's failures.
    async fn import(&self, kind: Role, upload: Upload) -> AppResult<ImportReport>;

    /// Example CSV for `kind`.
    fn template(&self, kind: Role) -> AppResult<Template>;

    /// Check that the database answers.
    async fn ping(&self) -> AppResult<()>;
}

/// Concrete implementation of RosterService.
pub struct RosterManager {
    engine: ImportEngine,
}

impl RosterManager {
    pub fn new(uow: Arc<dyn UnitOfWork>, config: ImportConfig) -> Self {
        Self {
            engine: ImportEngine::new(uow, config),
        }
    }
}

#[async_trait]
impl RosterService for RosterManager {
    async fn import(&self, kind: Role, upload: Upload) -> AppResult<ImportReport> {
        self.engine.import(kind, upload).await.map_err(|e| {
            tracing::warn!(kind = %kind, error = %e, "Import rejected");
            e.into()
        })
    }

    fn template(&self, kind: Role) -> AppResult<Template> {
        let descriptor = EntityDescriptor::for_role(kind);
        Ok(Template {
            file_name: descriptor.template_file_name(),
            content_type: TEMPLATE_CONTENT_TYPE,
            bytes: template_csv(descriptor)?,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        self.engine.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRoster;
    use common::AppError;

    fn manager() -> (Arc<MemoryRoster>, RosterManager) {
        let roster = Arc::new(MemoryRoster::new());
        let manager = RosterManager::new(roster.clone(), ImportConfig::default());
        (roster, manager)
    }

    #[tokio::test]
    async fn test_import_errors_map_to_app_errors() {
        let (_, manager) = manager();
        let upload = Upload {
            file_name: Some("data.txt".to_string()),
            bytes: b"\x00\x01".to_vec(),
            ..Default::default()
        };

        let err = manager.import(Role::Teacher, upload).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn test_missing_columns_are_bad_requests() {
        let (_, manager) = manager();
        let upload = Upload {
            file_name: Some("guru.csv".to_string()),
            bytes: b"nama,surel\nHasan,hasan@x.com\n".to_vec(),
            ..Default::default()
        };

        let err = manager.import(Role::Teacher, upload).await.unwrap_err();
        match err {
            AppError::BadRequest(message) => assert!(message.contains("name, email")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_template_file_names() {
        let (_, manager) = manager();

        let template = manager.template(Role::Guardian).unwrap();
        assert_eq!(template.file_name, "template_import_wali.csv");
        assert_eq!(template.content_type, "text/csv; charset=utf-8");
        assert!(template.bytes.starts_with(b"name,email,phone,address"));
    }

    #[tokio::test]
    async fn test_ping_follows_store() {
        let (roster, manager) = manager();
        assert!(manager.ping().await.is_ok());

        roster.set_unavailable(true);
        assert!(matches!(
            manager.ping().await,
            Err(AppError::ServiceUnavailable(_))
        ));
    }
}

//! Roster Service Library
//!
//! Bulk import and reconciliation of students, teachers, guardians and admins
//! from CSV / XLSX spreadsheets. Used by the HTTP gateway and by this crate's
//! own CLI.

pub mod config;
pub mod import;
pub mod infra;
pub mod repository;
pub mod service;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use domain::Role;

use crate::config::RosterServiceConfig;
use crate::import::{EntityDescriptor, Upload};
use crate::infra::Database;
use crate::repository::RosterStore;
use crate::service::{RosterManager, RosterService};

/// Connect to the database (applying migrations) and build the service.
pub async fn connect_service(
    config: &RosterServiceConfig,
) -> Result<Arc<dyn RosterService>, Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    let store = Arc::new(RosterStore::new(db.get_connection()));
    Ok(Arc::new(RosterManager::new(store, config.import.clone())))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = RosterServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Import a spreadsheet from disk and print the report.
pub async fn run_import_file(
    kind: Role,
    path: &Path,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = RosterServiceConfig::from_env();
    let service = connect_service(&config).await?;

    let upload = Upload {
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        content_type: None,
        bytes: tokio::fs::read(path).await?,
        password,
    };

    let report = service.import(kind, upload).await?;

    println!("{}", report.message);
    for failure in &report.failures {
        let column = failure.attribute.as_deref().unwrap_or("-");
        println!(
            "  baris {} [{}]: {}",
            failure.row,
            column,
            failure.errors.join("; ")
        );
    }

    Ok(())
}

/// Write the example CSV for `kind`, to `output` or the template's own name.
pub async fn write_template(
    kind: Role,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let descriptor = EntityDescriptor::for_role(kind);
    let bytes = import::template_csv(descriptor)?;

    let target = match output {
        Some(path) => path.to_path_buf(),
        None => descriptor.template_file_name().into(),
    };
    tokio::fs::write(&target, bytes).await?;
    info!("Template written to {}", target.display());

    Ok(())
}

//! Roster service configuration.

use std::env;

use common::{DatabaseConfig, ImportConfig};

/// Roster service configuration.
#[derive(Debug, Clone, Default)]
pub struct RosterServiceConfig {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
}

impl RosterServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_defaults = DatabaseConfig::default();
        let import_defaults = ImportConfig::default();

        Self {
            database: DatabaseConfig {
                url: env::var("ROSTER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(database_defaults.url),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(database_defaults.max_connections),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(database_defaults.min_connections),
            },
            import: ImportConfig {
                default_password: env::var("IMPORT_DEFAULT_PASSWORD")
                    .unwrap_or(import_defaults.default_password),
                placeholder_email_domain: env::var("IMPORT_PLACEHOLDER_EMAIL_DOMAIN")
                    .unwrap_or(import_defaults.placeholder_email_domain),
            },
        }
    }
}

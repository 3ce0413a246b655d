//! Roster Service - CLI for roster imports and database migrations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain::Role;
use roster_service_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "roster-service")]
#[command(about = "Bulk roster import for students, teachers, guardians and admins")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Import a CSV or XLSX file
    Import {
        /// student | teacher | guardian | admin (santri, guru, wali also accepted)
        kind: Role,
        file: PathBuf,
        /// Password for imported admins
        #[arg(long, env = "IMPORT_ADMIN_PASSWORD")]
        password: Option<String>,
    },
    /// Write the example CSV for an entity kind
    Template {
        kind: Role,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            roster_service_lib::run_migrations(migrate_action).await?;
        }
        Commands::Import {
            kind,
            file,
            password,
        } => {
            roster_service_lib::run_import_file(kind, &file, password).await?;
        }
        Commands::Template { kind, output } => {
            roster_service_lib::write_template(kind, output.as_deref()).await?;
        }
    }

    Ok(())
}

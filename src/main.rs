//! `moneywallet` maintenance binary.
//!
//! Prepares the database, seeds configured data, materialises due recurrent
//! transactions and optionally writes a backup. Meant to run once a day.

use dotenvy::dotenv;
use moneywallet::{
    config::{self, database},
    core::{
        backend::{BackendService, LocalBackend},
        backup::BackupService,
        category, currency, recurring,
    },
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and create missing tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database ready");

    // 5. Seed currencies and categories
    currency::seed_currencies(&db, &app_config.currencies).await?;
    category::ensure_system_categories(&db).await?;
    category::seed_categories(&db, &app_config.categories).await?;

    // 6. Materialise due recurrent transactions
    let today = chrono::Local::now().date_naive();
    let run = recurring::process_due_recurrences(&db, today)
        .await
        .inspect_err(|e| error!("Failed to process recurrent transactions: {e}"))?;
    info!(
        "Recurrences: {} processed, {} transactions created, {} finished",
        run.processed, run.created, run.finished
    );

    // 7. Back up
    if app_config.backup.auto_backup {
        let backend = LocalBackend::new(&app_config.backup.directory);
        backend.setup().await?;
        let mut service = BackupService::new(db.clone());
        if let Some(keep) = app_config.backup.keep_last {
            service = service.keep_last(keep);
        }
        let file = service
            .create_backup(&backend, None)
            .await
            .inspect_err(|e| error!("Backup failed: {e}"))?;
        info!("Backup written to {}", file.path.display());
    }

    Ok(())
}

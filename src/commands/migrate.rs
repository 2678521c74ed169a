//! Database migration command.

use mediahub_core::config::{AppConfig, StoreBackend};
use mediahub_core::error::AppError;
use mediahub_database::PgFolderStore;

use crate::output;

/// Apply pending migrations to the configured PostgreSQL database
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    if config.store.backend != StoreBackend::Postgres {
        output::print_warning("The memory backend has no schema to migrate");
        return Ok(());
    }

    let store = PgFolderStore::connect(&config.store.database).await?;
    let applied = store.migrate().await;
    store.close().await;
    applied?;
    output::print_success("Migrations applied");
    Ok(())
}

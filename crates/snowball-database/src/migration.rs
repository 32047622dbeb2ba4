//! Embedded schema migrations.

use sqlx::PgPool;
use tracing::info;

use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;

/// Apply the migrations under `migrations/` that the database has not seen.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;
    info!(known = migrator.iter().count(), "Schema up to date");
    Ok(())
}

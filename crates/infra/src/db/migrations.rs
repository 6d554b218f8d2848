use sqlx::migrate::Migrator;

use crate::db::pool::{DbPool, DbPoolError};

/// Quote and comment schema, embedded at build time.
static SCHEMA: Migrator = sqlx::migrate!("../../migrations");

/// Applies pending migrations; ones already recorded are skipped.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbPoolError> {
    SCHEMA.run(pool).await.map_err(DbPoolError::from)
}

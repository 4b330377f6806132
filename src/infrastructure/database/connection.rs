use diesel::{
    PgConnection,
    r2d2::{self, ConnectionManager},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;

use crate::infrastructure::config::DatabaseConfig;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Pool error: {0}")]
    PoolError(String),
    #[error("Migration error: {0}")]
    MigrationError(String),
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

pub fn create_connection_pool(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    let manager = ConnectionManager::<PgConnection>::new(config.url.as_str());

    r2d2::Pool::builder()
        .max_size(config.max_pool_size)
        .min_idle(Some(config.min_idle.min(config.max_pool_size)))
        .connection_timeout(config.connect_timeout)
        .build(manager)
        .map_err(|e| DatabaseError::PoolError(e.to_string()))
}

pub fn get_connection_from_pool(pool: &DbPool) -> Result<DbConnection, DatabaseError> {
    pool.get().map_err(|e| DatabaseError::PoolError(e.to_string()))
}

/// Brings `ocr_documents` up to the current schema. Safe to call on every start.
pub fn run_migrations(conn: &mut PgConnection) -> Result<usize, DatabaseError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    for version in &applied {
        tracing::info!(%version, "Applied migration");
    }

    Ok(applied.len())
}

/// Device store
///
/// Devices live in a single libsql table. Everything above this module talks
/// to the store through the [`DeviceRepository`] trait.
pub mod migrations;
pub mod models;
pub mod repository;

pub use models::{Device, DeviceStatus, NewDevice, StatusUpdate};
pub use repository::{DeviceRepository, LibsqlDeviceRepository};

use thiserror::Error;

use crate::pool::LibsqlManager;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Libsql(#[from] libsql::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),
    #[error("failed to build connection pool: {0}")]
    PoolBuild(#[from] deadpool::managed::BuildError),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("migration v{version} failed: {source}")]
    Migration {
        version: i32,
        #[source]
        source: libsql::Error,
    },
}

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<(), StoreError> {
    migrations::run_migrations(conn).await
}

/// Run migrations on a pooled connection
pub async fn initialize_pool(pool: &deadpool::managed::Pool<LibsqlManager>) -> Result<(), StoreError> {
    let conn = pool.get().await?;
    initialize_database(&conn).await
}

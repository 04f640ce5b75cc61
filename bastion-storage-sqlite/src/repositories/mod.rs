//! Repository implementations for SQLite storage

pub mod attempt;
pub mod counters;

pub use attempt::SqliteAttemptStore;
pub use counters::{SqliteCounterRepository, SqliteNoticeRepository};

use std::sync::Arc;

use async_trait::async_trait;
use bastion_core::{
    Error, StoreError,
    clock::{Clock, SystemClock},
    repositories::{
        AttemptStoreProvider, CounterRepositoryProvider, NoticeRepositoryProvider,
        RepositoryProvider,
    },
};
use bastion_migration::MigrationManager;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    attempts: Arc<SqliteAttemptStore>,
    counters: Arc<SqliteCounterRepository>,
    notices: Arc<SqliteNoticeRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Use `clock` to decide record expiry.
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Arc::new(SqliteAttemptStore::with_clock(pool.clone(), clock)),
            counters: Arc::new(SqliteCounterRepository::new(pool.clone())),
            notices: Arc::new(SqliteNoticeRepository::new(pool.clone())),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AttemptStoreProvider for SqliteRepositoryProvider {
    type AttemptRepo = SqliteAttemptStore;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

impl CounterRepositoryProvider for SqliteRepositoryProvider {
    type CounterRepo = SqliteCounterRepository;

    fn counters(&self) -> &Self::CounterRepo {
        &self.counters
    }
}

impl NoticeRepositoryProvider for SqliteRepositoryProvider {
    type NoticeRepo = SqliteNoticeRepository;

    fn notices(&self) -> &Self::NoticeRepo {
        &self.notices
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
        })?;

        manager.up(&migrations::all()).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, "Health check failed"))?;
        Ok(())
    }
}

/// Connection-level failures mean the store is unreachable; anything else is
/// a query error.
pub(crate) fn store_error(error: sqlx::Error, context: &str) -> Error {
    tracing::error!(error = %error, "{context}");
    let detail = format!("{context}: {error}");
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            Error::Store(StoreError::Unavailable(detail))
        }
        _ => Error::Store(StoreError::Database(detail)),
    }
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Store(StoreError::Database(format!("Invalid timestamp {millis}"))))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection in-memory database with the schema applied.
    pub(crate) async fn migrated_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        SqliteRepositoryProvider::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to migrate");
        pool
    }

    #[tokio::test]
    async fn test_health_check() {
        let provider = SqliteRepositoryProvider::new(migrated_pool().await);
        provider.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let pool = migrated_pool().await;
        let provider = SqliteRepositoryProvider::new(pool.clone());
        pool.close().await;

        let error = provider.health_check().await.unwrap_err();
        assert!(matches!(error, Error::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_invalid_timestamp() {
        assert!(from_millis(i64::MAX).is_err());
        assert!(from_millis(0).is_ok());
    }
}

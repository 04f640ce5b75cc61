//! Versioned schema migrations for SQL storage backends.
//!
//! A backend lists its [`Migration`]s in version order and hands them to its
//! [`MigrationManager`], which records applied versions in a tracking table
//! so each migration runs once.

use async_trait::async_trait;
use bastion_core::{Error, StoreError};
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Migration versions out of order: {previous} then {next}")]
    OutOfOrder { previous: i64, next: i64 },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<MigrationError> for Error {
    fn from(error: MigrationError) -> Self {
        Error::Store(StoreError::Migration(error.to_string()))
    }
}

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Orders migrations; must be unique and increasing.
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds
    pub applied_at: i64,
}

/// Reject a migration list whose versions are not strictly increasing.
pub fn check_order<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    for pair in migrations.windows(2) {
        let (previous, next) = (pair[0].version(), pair[1].version());
        if next <= previous {
            return Err(MigrationError::OutOfOrder { previous, next });
        }
    }
    Ok(())
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_bastion_migrations"
    }

    /// Create the tracking table if needed.
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration not yet recorded, in order.
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back recorded migrations, newest first.
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;

    /// Versions from `migrations` that have not been applied.
    async fn pending_versions(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<Vec<i64>> {
        let applied: Vec<i64> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(migrations
            .iter()
            .map(|m| m.version())
            .filter(|v| !applied.contains(v))
            .collect())
    }
}

//! SQLite storage backend for the bastion login guard.
//!
//! Failure counters, the blocked-attempt statistics and the operator notice
//! all survive restarts. Timestamps are stored as unix milliseconds.
//!
//! ```rust,ignore
//! let storage = SqliteRepositoryProvider::connect("sqlite://bastion.db?mode=rwc").await?;
//! storage.migrate().await?;
//! ```

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAttemptStore, SqliteCounterRepository, SqliteNoticeRepository, SqliteRepositoryProvider,
};

use bastion_core::{Error, StoreError};
use sqlx::SqlitePool;

impl SqliteRepositoryProvider {
    /// Open a pool for `database_url` and wrap it.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            Error::Store(StoreError::Unavailable(format!(
                "Failed to connect to {database_url}: {e}"
            )))
        })?;
        Ok(Self::new(pool))
    }
}

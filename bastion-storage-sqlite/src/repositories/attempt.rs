//! SQLite implementation of the attempt store.

use std::sync::Arc;

use async_trait::async_trait;
use bastion_core::{
    AttemptKey, AttemptRecord, Error,
    clock::{Clock, SystemClock},
    repositories::AttemptStore,
};
use chrono::Duration;
use sqlx::SqlitePool;

use super::{from_millis, store_error};

pub struct SqliteAttemptStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteAttemptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteAttemptRecord {
    failure_count: i64,
    expires_at: i64,
}

impl TryFrom<SqliteAttemptRecord> for AttemptRecord {
    type Error = Error;

    fn try_from(row: SqliteAttemptRecord) -> Result<Self, Self::Error> {
        Ok(AttemptRecord {
            failure_count: u32::try_from(row.failure_count).unwrap_or(u32::MAX),
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

#[async_trait]
impl AttemptStore for SqliteAttemptStore {
    async fn get_record(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, Error> {
        let now = self.clock.now().timestamp_millis();

        let row = sqlx::query_as::<_, SqliteAttemptRecord>(
            r#"
            SELECT failure_count, expires_at
            FROM login_attempts
            WHERE key = ? AND expires_at > ?
            "#,
        )
        .bind(key.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to read login attempts"))?;

        row.map(AttemptRecord::try_from).transpose()
    }

    async fn increment_with_ttl(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error> {
        let now = self.clock.now();
        let expires_at = (now + ttl).timestamp_millis();

        // One statement, so concurrent increments of a key serialize in SQLite.
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO login_attempts (key, failure_count, expires_at)
            VALUES (?1, 1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                failure_count = CASE
                    WHEN login_attempts.expires_at <= ?3 THEN 1
                    ELSE login_attempts.failure_count + 1
                END,
                expires_at = excluded.expires_at
            RETURNING failure_count
            "#,
        )
        .bind(key.as_str())
        .bind(expires_at)
        .bind(now.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to record failed login"))?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), Error> {
        sqlx::query("DELETE FROM login_attempts WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, "Failed to clear login attempts"))?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE expires_at <= ?")
            .bind(self.clock.now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, "Failed to purge expired login attempts"))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests::migrated_pool;
    use bastion_core::ManualClock;

    async fn store() -> (SqliteAttemptStore, ManualClock) {
        let clock = ManualClock::starting_now();
        let store = SqliteAttemptStore::with_clock(migrated_pool().await, Arc::new(clock.clone()));
        (store, clock)
    }

    #[tokio::test]
    async fn test_increment_and_get() {
        let (store, clock) = store().await;
        let key = AttemptKey::new("admin", "10.0.0.5");

        assert_eq!(store.get(&key).await.unwrap(), None);
        for n in 1..=3 {
            assert_eq!(
                store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap(),
                n
            );
        }

        let record = store.get_record(&key).await.unwrap().unwrap();
        assert_eq!(record.failure_count, 3);
        assert_eq!(
            record.expires_at.timestamp_millis(),
            (clock.now() + Duration::minutes(15)).timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_expired_record_is_absent_and_restarts() {
        let (store, clock) = store().await;
        let key = AttemptKey::new("admin", "10.0.0.5");

        store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();
        store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();
        clock.advance(Duration::minutes(15));

        assert_eq!(store.get(&key).await.unwrap(), None);
        assert_eq!(
            store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_clear_and_purge() {
        let (store, clock) = store().await;
        let old = AttemptKey::new("old", "10.0.0.1");
        let fresh = AttemptKey::new("fresh", "10.0.0.2");

        store.clear(&old).await.unwrap();
        store.increment_with_ttl(&old, Duration::minutes(5)).await.unwrap();
        clock.advance(Duration::minutes(10));
        store.increment_with_ttl(&fresh, Duration::minutes(5)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.get(&fresh).await.unwrap(), Some(1));

        store.clear(&fresh).await.unwrap();
        assert_eq!(store.get(&fresh).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(SqliteAttemptStore::new(migrated_pool().await));
        let key = AttemptKey::new("admin", "10.0.0.5");

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .increment_with_ttl(&key, Duration::minutes(15))
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get(&key).await.unwrap(), Some(100));
    }
}

//! SQLite implementations of the counter and notice repositories. Both tables
//! hold at most one row, `id = 1`.

use async_trait::async_trait;
use bastion_core::{
    Error, GlobalCounters, OperatorNotice,
    repositories::{CounterRepository, NoticeRepository},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_millis, store_error};

pub struct SqliteCounterRepository {
    pool: SqlitePool,
}

impl SqliteCounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteGlobalCounters {
    blocked_attempts_total: i64,
    last_blocked_at: Option<i64>,
}

impl TryFrom<SqliteGlobalCounters> for GlobalCounters {
    type Error = Error;

    fn try_from(row: SqliteGlobalCounters) -> Result<Self, Self::Error> {
        Ok(GlobalCounters {
            blocked_attempts_total: u64::try_from(row.blocked_attempts_total).unwrap_or(0),
            last_blocked_at: row.last_blocked_at.map(from_millis).transpose()?,
        })
    }
}

#[async_trait]
impl CounterRepository for SqliteCounterRepository {
    async fn counters(&self) -> Result<GlobalCounters, Error> {
        let row = sqlx::query_as::<_, SqliteGlobalCounters>(
            "SELECT blocked_attempts_total, last_blocked_at FROM guard_counters WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to read guard counters"))?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(GlobalCounters::default()),
        }
    }

    async fn record_blocked(&self, at: DateTime<Utc>) -> Result<GlobalCounters, Error> {
        let row = sqlx::query_as::<_, SqliteGlobalCounters>(
            r#"
            INSERT INTO guard_counters (id, blocked_attempts_total, last_blocked_at)
            VALUES (1, 1, ?)
            ON CONFLICT(id) DO UPDATE SET
                blocked_attempts_total = guard_counters.blocked_attempts_total + 1,
                last_blocked_at = excluded.last_blocked_at
            RETURNING blocked_attempts_total, last_blocked_at
            "#,
        )
        .bind(at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to record blocked attempt"))?;

        row.try_into()
    }
}

pub struct SqliteNoticeRepository {
    pool: SqlitePool,
}

impl SqliteNoticeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteOperatorNotice {
    message: String,
    recorded_at: i64,
}

#[async_trait]
impl NoticeRepository for SqliteNoticeRepository {
    async fn set_notice(&self, notice: OperatorNotice) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO operator_notices (id, message, recorded_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                message = excluded.message,
                recorded_at = excluded.recorded_at
            "#,
        )
        .bind(&notice.message)
        .bind(notice.recorded_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to store operator notice"))?;
        Ok(())
    }

    async fn take_notice(&self) -> Result<Option<OperatorNotice>, Error> {
        let row = sqlx::query_as::<_, SqliteOperatorNotice>(
            "DELETE FROM operator_notices WHERE id = 1 RETURNING message, recorded_at",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, "Failed to read operator notice"))?;

        row.map(|row| {
            Ok(OperatorNotice {
                message: row.message,
                recorded_at: from_millis(row.recorded_at)?,
            })
        })
        .transpose()
    }
}

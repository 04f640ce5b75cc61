//! Schema for the SQLite backend.
//!
//! Timestamps are stored as unix milliseconds. The counter and notice tables
//! hold at most one row each, pinned to `id = 1`.

use async_trait::async_trait;
use bastion_migration::{Migration, MigrationError, MigrationManager, MigrationRecord};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

/// A migration made of plain SQL statements, run in order.
pub struct SqlMigration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static [&'static str],
    pub down: &'static [&'static str],
}

pub const LOGIN_ATTEMPTS: SqlMigration = SqlMigration {
    version: 1,
    name: "create_login_attempts",
    up: &[
        r#"
        CREATE TABLE IF NOT EXISTS login_attempts (
            key TEXT PRIMARY KEY,
            failure_count INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS idx_login_attempts_expires_at ON login_attempts(expires_at)",
    ],
    down: &["DROP TABLE IF EXISTS login_attempts"],
};

pub const GUARD_COUNTERS: SqlMigration = SqlMigration {
    version: 2,
    name: "create_guard_counters",
    up: &[r#"
        CREATE TABLE IF NOT EXISTS guard_counters (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            blocked_attempts_total INTEGER NOT NULL DEFAULT 0,
            last_blocked_at INTEGER
        )"#],
    down: &["DROP TABLE IF EXISTS guard_counters"],
};

pub const OPERATOR_NOTICES: SqlMigration = SqlMigration {
    version: 3,
    name: "create_operator_notices",
    up: &[r#"
        CREATE TABLE IF NOT EXISTS operator_notices (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            message TEXT NOT NULL,
            recorded_at INTEGER NOT NULL
        )"#],
    down: &["DROP TABLE IF EXISTS operator_notices"],
};

/// Every schema migration, oldest first.
pub fn all() -> Vec<Box<dyn Migration<Sqlite>>> {
    vec![
        Box::new(LOGIN_ATTEMPTS),
        Box::new(GUARD_COUNTERS),
        Box::new(OPERATOR_NOTICES),
    ]
}

async fn execute_all(
    conn: &mut SqliteConnection,
    statements: &[&str],
) -> Result<(), MigrationError> {
    for statement in statements {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl Migration<Sqlite> for SqlMigration {
    async fn up<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<(), MigrationError> {
        execute_all(conn, self.up).await
    }

    async fn down<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<(), MigrationError> {
        execute_all(conn, self.down).await
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run one migration step and its bookkeeping in a single transaction.
    async fn step(
        &self,
        migration: &dyn Migration<Sqlite>,
        rollback: bool,
    ) -> Result<(), MigrationError> {
        let table = self.get_migration_table_name();
        let mut tx = self.pool.begin().await?;

        if rollback {
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Rolling back migration"
            );
            migration.down(&mut *tx).await?;
            sqlx::query(&format!("DELETE FROM {table} WHERE version = ?"))
                .bind(migration.version())
                .execute(&mut *tx)
                .await?;
        } else {
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Applying migration"
            );
            migration.up(&mut *tx).await?;
            sqlx::query(&format!(
                "INSERT INTO {table} (version, name, applied_at) VALUES (?, ?, ?)"
            ))
            .bind(migration.version())
            .bind(migration.name())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MigrationManager<Sqlite> for SqliteMigrationManager {
    async fn initialize(&self) -> Result<(), MigrationError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )",
            self.get_migration_table_name()
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        bastion_migration::check_order(migrations)?;

        for migration in migrations {
            if !self.is_applied(migration.version()).await? {
                self.step(migration.as_ref(), false).await?;
            }
        }
        Ok(())
    }

    async fn down(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        for migration in migrations.iter().rev() {
            if self.is_applied(migration.version()).await? {
                self.step(migration.as_ref(), true).await?;
            }
        }
        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let sql = format!(
            "SELECT version, name, applied_at FROM {} ORDER BY version",
            self.get_migration_table_name()
        );
        Ok(sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE version = ?)",
            self.get_migration_table_name()
        );
        Ok(sqlx::query_scalar(&sql)
            .bind(version)
            .fetch_one(&self.pool)
            .await?)
    }
}

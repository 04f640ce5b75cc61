//! Tests for the Bastion builder

use bastion::{BastionBuilder, GuardConfig, NotificationConfig};

#[tokio::test]
async fn test_builder_with_memory() {
    let bastion = BastionBuilder::new()
        .with_memory()
        .build()
        .await
        .expect("Failed to build Bastion");

    bastion.health_check().await.expect("Health check failed");
    assert!(bastion.guard().is_enabled());
    bastion.shutdown().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_with_sqlite() {
    let bastion = BastionBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Bastion");

    bastion.health_check().await.expect("Health check failed");
    bastion.shutdown().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_manual_migration() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let bastion = BastionBuilder::new()
        .with_sqlite_pool(pool)
        .build()
        .await
        .expect("Failed to build Bastion");

    bastion.migrate().await.expect("Migration failed");
    bastion.health_check().await.expect("Health check failed");
    assert_eq!(bastion.stats().await.unwrap().blocked_attempts_total, 0);
    bastion.shutdown().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_rejects_bad_url() {
    let result = BastionBuilder::new()
        .with_sqlite("sqlite:///nonexistent/dir/bastion.db")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_builder_with_configuration() {
    let guard = GuardConfig {
        max_failed_attempts: 10,
        ..GuardConfig::default()
    };
    let bastion = BastionBuilder::new()
        .with_memory()
        .with_guard_config(guard)
        .with_notifications(NotificationConfig::disabled())
        .with_cleanup(false)
        .build()
        .await
        .expect("Failed to build Bastion");

    assert_eq!(bastion.guard().config().max_failed_attempts, 10);
    bastion.shutdown().await;
}

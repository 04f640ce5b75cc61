//! Builder pattern for constructing Bastion instances
//!
//! Storage must be chosen before anything can be built; the type parameter of
//! [`BastionBuilder`] records whether it has been.
//!
//! # Example
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, GuardConfig, NotificationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_guard_config(GuardConfig::from_env()?)
//!         .with_notifications(NotificationConfig::from_env()?)
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     bastion.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use bastion_core::{
    Clock, EventSink, GuardConfig, LoginGuard, MemoryRepositoryProvider, NoopSink,
    NotificationConfig, NotificationDispatcher, Notifier, RepositoryProvider, SystemClock,
    TracingNotifier,
};
use tokio::sync::watch;

use crate::Bastion;

#[cfg(feature = "mailer")]
use crate::MailerConfig;

#[derive(Debug, thiserror::Error)]
pub enum BastionBuilderError {
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[cfg(feature = "mailer")]
    #[error("Mailer configuration failed: {0}")]
    MailerConfiguration(String),
}

/// Initial state of [`BastionBuilder`]: no storage yet.
pub struct NoStorage;

/// Storage has been chosen.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// Type-state builder for [`Bastion`].
///
/// # Defaults
///
/// - Guard: enabled, 5 failures, 15 minute window, fail-closed
/// - Notifications: enabled, logged through `tracing`, no mail recipient
/// - Background cleanup: on
/// - Apply migrations: false
pub struct BastionBuilder<Storage> {
    storage: Storage,
    guard_config: GuardConfig,
    notification_config: NotificationConfig,
    notifiers: Vec<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
    apply_migrations: bool,
    cleanup: bool,
    #[cfg(feature = "mailer")]
    mailer_config: Option<MailerConfig>,
}

impl Default for BastionBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl BastionBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            guard_config: GuardConfig::default(),
            notification_config: NotificationConfig::default(),
            notifiers: Vec::new(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
            cleanup: true,
            #[cfg(feature = "mailer")]
            mailer_config: None,
        }
    }

    /// Use an already constructed storage backend.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> BastionBuilder<WithStorage<R>> {
        BastionBuilder {
            storage: WithStorage { repositories },
            guard_config: self.guard_config,
            notification_config: self.notification_config,
            notifiers: self.notifiers,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
            cleanup: self.cleanup,
            #[cfg(feature = "mailer")]
            mailer_config: self.mailer_config,
        }
    }

    /// Keep all state in process memory.
    pub fn with_memory(self) -> BastionBuilder<WithStorage<MemoryRepositoryProvider>> {
        let repositories = Arc::new(MemoryRepositoryProvider::with_clock(self.clock.clone()));
        self.with_repositories(repositories)
    }
}

#[cfg(feature = "sqlite")]
impl BastionBuilder<NoStorage> {
    /// Connect to the SQLite database at `url`, e.g. `sqlite://bastion.db?mode=rwc`.
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        BastionBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>>,
        BastionBuilderError,
    > {
        let pool = sqlx::SqlitePool::connect(url)
            .await
            .map_err(|e| BastionBuilderError::StorageConnection(e.to_string()))?;
        Ok(self.with_sqlite_pool(pool))
    }

    /// Share an existing pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> BastionBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>> {
        let repositories = Arc::new(crate::sqlite::SqliteRepositoryProvider::with_clock(
            pool,
            self.clock.clone(),
        ));
        self.with_repositories(repositories)
    }
}

impl<S> BastionBuilder<S> {
    /// Time source for the guard, the dispatcher and any storage created
    /// afterwards by this builder.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_guard_config(mut self, config: GuardConfig) -> Self {
        self.guard_config = config;
        self
    }

    pub fn with_notifications(mut self, config: NotificationConfig) -> Self {
        self.notification_config = config;
        self
    }

    /// Deliver events to `notifier` as well as the log.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Run the hourly purge of expired records. On by default.
    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup = enabled;
        self
    }

    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Send notification emails to the configured recipient.
    #[cfg(feature = "mailer")]
    pub fn with_mailer(mut self, config: MailerConfig) -> Self {
        self.mailer_config = Some(config);
        self
    }

    #[cfg(feature = "mailer")]
    pub fn with_mailer_from_env(mut self) -> Result<Self, BastionBuilderError> {
        let config = MailerConfig::from_env()
            .map_err(|e| BastionBuilderError::MailerConfiguration(e.to_string()))?;
        self.mailer_config = Some(config);
        Ok(self)
    }
}

impl<R: RepositoryProvider> BastionBuilder<WithStorage<R>> {
    /// Finish configuration and start background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<Bastion<R>, BastionBuilderError> {
        let repositories = self.storage.repositories;

        if self.apply_migrations {
            repositories
                .migrate()
                .await
                .map_err(|e| BastionBuilderError::Migration(e.to_string()))?;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let events: Arc<dyn EventSink> = if self.notification_config.enabled {
            let mut dispatcher = NotificationDispatcher::new(Arc::clone(&repositories))
                .with_capacity(self.notification_config.queue_capacity)
                .with_clock(self.clock.clone())
                .with_notifier(Arc::new(TracingNotifier));

            for notifier in self.notifiers {
                dispatcher = dispatcher.with_notifier(notifier);
            }

            #[cfg(feature = "mailer")]
            if let Some(config) = self.mailer_config {
                if self.notification_config.recipient.is_some() {
                    let mailer = crate::MailerNotifier::new(config, &self.notification_config)
                        .map_err(|e| BastionBuilderError::MailerConfiguration(e.to_string()))?;
                    dispatcher = dispatcher.with_notifier(Arc::new(mailer));
                } else {
                    tracing::warn!("Mailer configured without a notification recipient, not sending email");
                }
            }

            let (handle, task) = dispatcher.spawn(shutdown_rx.clone());
            tasks.push(task);
            Arc::new(handle)
        } else {
            Arc::new(NoopSink)
        };

        let guard = LoginGuard::new(Arc::clone(&repositories), self.guard_config)
            .with_event_sink(events)
            .with_clock(self.clock);

        if self.cleanup && guard.is_enabled() {
            tasks.push(guard.start_cleanup_task(shutdown_rx));
        }

        Ok(Bastion::from_parts(repositories, guard, shutdown, tasks))
    }
}

//! # Bastion
//!
//! Bastion guards a login form against password guessing. Before running its
//! own authenticator, the host asks whether the attempt may proceed; afterwards
//! it reports whether authentication succeeded. After five failures for the
//! same username and client address within fifteen minutes, further attempts
//! are refused until the window lapses or a login succeeds. Every refusal is
//! counted, and operators are notified of refusals and successful logins.
//!
//! ## Storage Support
//!
//! - In-memory (single process, nothing persisted)
//! - SQLite (feature `sqlite`, enabled by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use bastion::{AuthOutcome, BastionBuilder, Decision, SuccessContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite://bastion.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     if let Decision::Deny(denial) = bastion.evaluate_attempt("admin", "10.0.0.5").await {
//!         eprintln!("{}", denial.message);
//!         return Ok(());
//!     }
//!
//!     let password_ok = false;
//!     let outcome = if password_ok {
//!         AuthOutcome::Success(SuccessContext::default())
//!     } else {
//!         AuthOutcome::Failure
//!     };
//!     bastion.record_outcome("admin", "10.0.0.5", outcome).await;
//!
//!     bastion.shutdown().await;
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

pub mod builder;

pub use builder::{BastionBuilder, BastionBuilderError, NoStorage, WithStorage};

pub use bastion_core::{
    AttemptKey, AuthOutcome, Clock, Decision, Denial, DenialReason, FailurePolicy,
    GlobalCounters, GuardConfig, LockoutStatus, LoginGuard, ManualClock,
    MemoryRepositoryProvider, NotificationConfig, NotificationEvent, Notifier, OperatorNotice,
    OutcomeStatus, RepositoryProvider, SuccessContext, SystemClock, TracingNotifier,
};

#[cfg(feature = "mailer")]
pub use bastion_core::MailerNotifier;
#[cfg(feature = "mailer")]
pub use bastion_mailer::MailerConfig;

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use bastion_storage_sqlite::{SqliteRepositoryProvider, migrations};
}

#[derive(Debug, thiserror::Error)]
pub enum BastionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl From<bastion_core::Error> for BastionError {
    fn from(error: bastion_core::Error) -> Self {
        match error {
            bastion_core::Error::Validation(e) => BastionError::Validation(e.to_string()),
            other => BastionError::Storage(other.to_string()),
        }
    }
}

/// A configured login guard together with its background tasks.
///
/// Build one with [`BastionBuilder`]. Call [`Bastion::shutdown`] before
/// exiting so queued notifications are delivered.
pub struct Bastion<R: RepositoryProvider> {
    repositories: Arc<R>,
    guard: Arc<LoginGuard<R>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<R: RepositoryProvider> Bastion<R> {
    pub(crate) fn from_parts(
        repositories: Arc<R>,
        guard: LoginGuard<R>,
        shutdown: watch::Sender<bool>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            repositories,
            guard: Arc::new(guard),
            shutdown,
            tasks: Mutex::new(tasks),
        }
    }

    pub fn guard(&self) -> &Arc<LoginGuard<R>> {
        &self.guard
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    pub async fn migrate(&self) -> Result<(), BastionError> {
        self.repositories.migrate().await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), BastionError> {
        self.repositories.health_check().await?;
        Ok(())
    }

    /// See [`LoginGuard::evaluate_attempt`].
    pub async fn evaluate_attempt(&self, identity: &str, origin: &str) -> Decision {
        self.guard.evaluate_attempt(identity, origin).await
    }

    /// See [`LoginGuard::record_outcome`].
    pub async fn record_outcome(
        &self,
        identity: &str,
        origin: &str,
        outcome: AuthOutcome,
    ) -> OutcomeStatus {
        self.guard.record_outcome(identity, origin, outcome).await
    }

    pub async fn lockout_status(
        &self,
        identity: &str,
        origin: &str,
    ) -> Result<LockoutStatus, BastionError> {
        Ok(self.guard.lockout_status(identity, origin).await?)
    }

    /// Clear a pair's failures. Returns whether it was locked.
    pub async fn unlock(&self, identity: &str, origin: &str) -> Result<bool, BastionError> {
        Ok(self.guard.unlock(identity, origin).await?)
    }

    /// Blocked-attempt statistics.
    pub async fn stats(&self) -> Result<GlobalCounters, BastionError> {
        Ok(self.guard.counters().await?)
    }

    /// Read and clear the last notification delivery failure.
    pub async fn take_notice(&self) -> Result<Option<OperatorNotice>, BastionError> {
        Ok(self.guard.take_notice().await?)
    }

    pub async fn purge_expired(&self) -> Result<u64, BastionError> {
        Ok(self.guard.purge_expired().await?)
    }

    /// Stop background tasks, delivering queued notifications first.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
    }
}

//! Login guard: decides whether an attempt may proceed and records its
//! outcome.
//!
//! The host application calls [`LoginGuard::evaluate_attempt`] before running
//! its own authenticator. On [`Decision::Allow`] it authenticates and then
//! reports the result with [`LoginGuard::record_outcome`]. Neither call returns
//! an error: store failures are resolved by the configured
//! [`FailurePolicy`], and notifications are handed to an [`EventSink`] without
//! waiting for delivery.
//!
//! # Example
//!
//! ```rust,ignore
//! use bastion_core::prelude::*;
//!
//! let guard = LoginGuard::new(Arc::new(MemoryRepositoryProvider::new()), GuardConfig::default());
//!
//! match guard.evaluate_attempt("admin", "10.0.0.5").await {
//!     Decision::Deny(denial) => return Err(denial.message),
//!     Decision::Allow => {}
//! }
//!
//! let outcome = if password_ok {
//!     AuthOutcome::Success(SuccessContext::default())
//! } else {
//!     AuthOutcome::Failure
//! };
//! guard.record_outcome("admin", "10.0.0.5", outcome).await;
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    clock::{Clock, SystemClock},
    config::{FailurePolicy, GuardConfig},
    error::{StoreError, ValidationError},
    events::{EventSink, NoopSink, NotificationEvent},
    repositories::{AttemptStore, CounterRepository, NoticeRepository, RepositoryProvider},
    storage::{AttemptKey, GlobalCounters, LockoutStatus, OperatorNotice},
};

const STORE_UNAVAILABLE_MESSAGE: &str =
    "Login is temporarily unavailable. Please try again later.";

/// Verdict for a single login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

/// Why an attempt was refused, and what to tell the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenialReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// The pair reached the failure threshold within the window.
    Locked {
        failed_attempts: u32,
        locked_until: DateTime<Utc>,
    },
    /// The store could not answer and the policy is fail-closed.
    StoreUnavailable,
}

/// Result of the host's own authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Failure,
    Success(SuccessContext),
}

/// Details of a successful login, passed through to notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessContext {
    pub roles: Vec<String>,
    pub user_agent: Option<String>,
}

/// What [`LoginGuard::record_outcome`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Protection disabled or identity empty; nothing recorded.
    Skipped,
    FailureRecorded { failed_attempts: u32 },
    Cleared,
    /// The store failed; the outcome was logged and dropped.
    StoreUnavailable,
}

pub struct LoginGuard<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: GuardConfig,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl<R: RepositoryProvider> LoginGuard<R> {
    /// Create a guard that publishes nowhere and reads the system clock.
    pub fn new(repositories: Arc<R>, config: GuardConfig) -> Self {
        Self {
            repositories,
            config,
            events: Arc::new(NoopSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replace the clock. Stores carry their own clock; give both the same one.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    /// Decide whether an attempt by `identity` from `origin` may proceed.
    ///
    /// A denial for a locked pair bumps the blocked-attempts counter and emits
    /// a [`NotificationEvent::Blocked`], but leaves the pair's own record and
    /// expiry untouched.
    pub async fn evaluate_attempt(&self, identity: &str, origin: &str) -> Decision {
        if !self.config.enabled {
            return Decision::Allow;
        }

        if identity.trim().is_empty() {
            tracing::warn!(
                origin = %origin,
                error = %ValidationError::InvalidIdentity,
                "Allowing login attempt without guard check"
            );
            return Decision::Allow;
        }

        let key = AttemptKey::new(identity, origin);
        let record = match self
            .bounded(self.repositories.attempts().get_record(&key))
            .await
        {
            Ok(record) => record,
            Err(e) => return self.on_store_failure(&key, e),
        };

        let Some(record) = record else {
            return Decision::Allow;
        };

        if record.failure_count < self.config.max_failed_attempts {
            return Decision::Allow;
        }

        let now = self.clock.now();
        match self
            .bounded(self.repositories.counters().record_blocked(now))
            .await
        {
            Ok(counters) => {
                tracing::debug!(
                    blocked_attempts_total = counters.blocked_attempts_total,
                    "Recorded blocked attempt"
                );
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to record blocked attempt");
            }
        }

        tracing::warn!(
            identity = %identity,
            origin = %origin,
            failed_attempts = record.failure_count,
            locked_until = %record.expires_at,
            "Login attempt blocked"
        );

        self.events.publish(NotificationEvent::Blocked {
            identity: identity.to_string(),
            origin: origin.to_string(),
            failed_attempts: record.failure_count,
            window: self.config.window_description(),
            occurred_at: now,
        });

        Decision::Deny(Denial {
            reason: DenialReason::Locked {
                failed_attempts: record.failure_count,
                locked_until: record.expires_at,
            },
            message: self.config.lockout_message(),
        })
    }

    /// Record the result of the host's authentication.
    ///
    /// A failure increments the pair's counter and restarts its window. A
    /// success clears the counter and emits a
    /// [`NotificationEvent::SuccessfulLogin`].
    pub async fn record_outcome(
        &self,
        identity: &str,
        origin: &str,
        outcome: AuthOutcome,
    ) -> OutcomeStatus {
        if !self.config.enabled {
            return OutcomeStatus::Skipped;
        }

        if identity.trim().is_empty() {
            tracing::warn!(
                origin = %origin,
                error = %ValidationError::InvalidIdentity,
                "Not recording login outcome"
            );
            return OutcomeStatus::Skipped;
        }

        let key = AttemptKey::new(identity, origin);
        match outcome {
            AuthOutcome::Failure => {
                let result = self
                    .bounded(
                        self.repositories
                            .attempts()
                            .increment_with_ttl(&key, self.config.lockout_window),
                    )
                    .await;

                match result {
                    Ok(failed_attempts) => {
                        if failed_attempts == self.config.max_failed_attempts {
                            tracing::warn!(
                                key = %key,
                                failed_attempts = failed_attempts,
                                "Lockout threshold reached"
                            );
                        } else {
                            tracing::debug!(
                                key = %key,
                                failed_attempts = failed_attempts,
                                "Recorded failed login attempt"
                            );
                        }
                        OutcomeStatus::FailureRecorded { failed_attempts }
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "Failed to record failed login");
                        OutcomeStatus::StoreUnavailable
                    }
                }
            }
            AuthOutcome::Success(context) => {
                if let Err(e) = self.bounded(self.repositories.attempts().clear(&key)).await {
                    tracing::error!(key = %key, error = %e, "Failed to clear login attempts");
                    return OutcomeStatus::StoreUnavailable;
                }

                self.events.publish(NotificationEvent::SuccessfulLogin {
                    identity: identity.to_string(),
                    origin: origin.to_string(),
                    roles: context.roles,
                    user_agent: context.user_agent,
                    occurred_at: self.clock.now(),
                });

                OutcomeStatus::Cleared
            }
        }
    }

    /// Current lockout state of a pair. Read only.
    pub async fn lockout_status(&self, identity: &str, origin: &str) -> Result<LockoutStatus, Error> {
        if identity.trim().is_empty() {
            return Err(ValidationError::InvalidIdentity.into());
        }

        let key = AttemptKey::new(identity, origin);
        let record = self
            .bounded(self.repositories.attempts().get_record(&key))
            .await?;

        Ok(match record {
            Some(record) if record.failure_count >= self.config.max_failed_attempts => {
                LockoutStatus {
                    failed_attempts: record.failure_count,
                    is_locked: true,
                    locked_until: Some(record.expires_at),
                }
            }
            Some(record) => LockoutStatus {
                failed_attempts: record.failure_count,
                is_locked: false,
                locked_until: None,
            },
            None => LockoutStatus::unlocked(),
        })
    }

    /// Drop a pair's failure history.
    ///
    /// # Returns
    ///
    /// `true` if the pair was locked before the call.
    pub async fn unlock(&self, identity: &str, origin: &str) -> Result<bool, Error> {
        let was_locked = self.lockout_status(identity, origin).await?.is_locked;
        let key = AttemptKey::new(identity, origin);
        self.bounded(self.repositories.attempts().clear(&key)).await?;

        if was_locked {
            tracing::info!(key = %key, "Login lockout cleared by operator");
        }
        Ok(was_locked)
    }

    pub async fn counters(&self) -> Result<GlobalCounters, Error> {
        self.bounded(self.repositories.counters().counters()).await
    }

    /// Read and clear the last notification delivery failure.
    pub async fn take_notice(&self) -> Result<Option<OperatorNotice>, Error> {
        self.bounded(self.repositories.notices().take_notice()).await
    }

    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.bounded(self.repositories.attempts().purge_expired()).await
    }

    /// Start the background purge of expired attempt records.
    ///
    /// Runs every `cleanup_interval` until `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repositories = Arc::clone(&self.repositories);
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repositories.attempts().purge_expired().await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Purged expired login attempt records");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to purge expired login attempt records");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt cleanup task");
                        break;
                    }
                }
            }
        })
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match tokio::time::timeout(self.config.store_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.store_timeout).into()),
        }
    }

    fn on_store_failure(&self, key: &AttemptKey, error: Error) -> Decision {
        match self.config.failure_policy {
            FailurePolicy::FailClosed => {
                tracing::error!(
                    key = %key,
                    error = %error,
                    "Attempt store unavailable, denying login attempt"
                );
                Decision::Deny(Denial {
                    reason: DenialReason::StoreUnavailable,
                    message: STORE_UNAVAILABLE_MESSAGE.to_string(),
                })
            }
            FailurePolicy::FailOpen => {
                tracing::error!(
                    key = %key,
                    error = %error,
                    "Attempt store unavailable, allowing login attempt"
                );
                Decision::Allow
            }
        }
    }
}

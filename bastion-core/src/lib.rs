//! Core of the bastion login attempt guard.
//!
//! A [`LoginGuard`] sits in front of an application's own authenticator. It
//! counts failed logins per `(identity, origin)` pair in an [`AttemptStore`],
//! refuses further attempts once a pair reaches the configured threshold, and
//! clears the count on a successful login. Lockouts and successful logins are
//! published as [`NotificationEvent`]s and delivered in the background by the
//! [`NotificationDispatcher`].
//!
//! Storage is abstracted by the traits in [`repositories`]. An in-memory
//! backend ships here; the durable SQLite backend lives in
//! `bastion-storage-sqlite`.
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FailurePolicy, GuardConfig, NotificationConfig};
pub use error::{ConfigError, DispatchError, Error, StoreError, ValidationError};
pub use events::{EventSink, NoopSink, NotificationEvent, Notifier, TracingNotifier};
pub use repositories::{
    AttemptStore, CounterRepository, MemoryRepositoryProvider, NoticeRepository,
    RepositoryProvider,
};
pub use services::{
    AuthOutcome, Decision, Denial, DenialReason, DispatcherHandle, LoginGuard,
    NotificationDispatcher, OutcomeStatus, SuccessContext,
};
pub use storage::{AttemptKey, AttemptRecord, GlobalCounters, LockoutStatus, OperatorNotice};

#[cfg(feature = "mailer")]
pub use services::MailerNotifier;

pub mod prelude {
    pub use crate::repositories::{
        AttemptStoreProvider, CounterRepositoryProvider, NoticeRepositoryProvider,
    };
    pub use crate::{
        AttemptKey, AttemptStore, AuthOutcome, Clock, CounterRepository, Decision, Denial,
        DenialReason, Error, EventSink, FailurePolicy, GuardConfig, LockoutStatus, LoginGuard,
        MemoryRepositoryProvider, NoticeRepository, NotificationConfig, NotificationEvent,
        Notifier, OutcomeStatus, RepositoryProvider, SuccessContext,
    };
}

//! Service layer: the guard and the notification pipeline.

pub mod dispatcher;
pub mod guard;
pub mod mailer;

pub use dispatcher::{DispatcherHandle, NotificationDispatcher};
pub use guard::{
    AuthOutcome, Decision, Denial, DenialReason, LoginGuard, OutcomeStatus, SuccessContext,
};

#[cfg(feature = "mailer")]
pub use mailer::MailerNotifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Something the guard wants an operator to hear about.
///
/// Events are produced on the authentication path and handed to an
/// [`EventSink`]; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// An attempt was denied because the pair is locked out.
    Blocked {
        identity: String,
        origin: String,
        /// Failures recorded in the current window
        failed_attempts: u32,
        /// Lockout window in words, e.g. "15 minutes"
        window: String,
        occurred_at: DateTime<Utc>,
    },

    /// A login succeeded and any failure history was cleared.
    SuccessfulLogin {
        identity: String,
        origin: String,
        roles: Vec<String>,
        user_agent: Option<String>,
        occurred_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::Blocked { .. } => "blocked",
            NotificationEvent::SuccessfulLogin { .. } => "successful_login",
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            NotificationEvent::Blocked { identity, .. }
            | NotificationEvent::SuccessfulLogin { identity, .. } => identity,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NotificationEvent::Blocked { occurred_at, .. }
            | NotificationEvent::SuccessfulLogin { occurred_at, .. } => *occurred_at,
        }
    }
}

/// Where the guard hands off events.
///
/// `publish` is synchronous and must not block: the caller is on the
/// authentication path.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: NotificationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: NotificationEvent) {}
}

/// A delivery channel for events, e.g. email.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use bastion_core::{DispatchError, NotificationEvent, Notifier};
/// struct Webhook;
///
/// #[async_trait]
/// impl Notifier for Webhook {
///     fn name(&self) -> &str {
///         "webhook"
///     }
///
///     async fn notify(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
///         // POST the event somewhere...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Short label used in logs and operator notices.
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotificationEvent) -> Result<(), DispatchError>;
}

/// Writes events to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
        match event {
            NotificationEvent::Blocked {
                identity,
                origin,
                failed_attempts,
                window,
                occurred_at,
            } => {
                tracing::warn!(
                    identity = %identity,
                    origin = %origin,
                    failed_attempts = failed_attempts,
                    window = %window,
                    occurred_at = %occurred_at,
                    "Blocked login attempt"
                );
            }
            NotificationEvent::SuccessfulLogin {
                identity,
                origin,
                roles,
                user_agent,
                occurred_at,
            } => {
                tracing::info!(
                    identity = %identity,
                    origin = %origin,
                    roles = ?roles,
                    user_agent = user_agent.as_deref().unwrap_or("unknown"),
                    occurred_at = %occurred_at,
                    "Successful login"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked() -> NotificationEvent {
        NotificationEvent::Blocked {
            identity: "admin".to_string(),
            origin: "10.0.0.5".to_string(),
            failed_attempts: 5,
            window: "15 minutes".to_string(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_accessors() {
        let event = blocked();
        assert_eq!(event.kind(), "blocked");
        assert_eq!(event.identity(), "admin");

        let at = Utc::now();
        let event = NotificationEvent::SuccessfulLogin {
            identity: "editor".to_string(),
            origin: "10.0.0.9".to_string(),
            roles: vec!["editor".to_string()],
            user_agent: None,
            occurred_at: at,
        };
        assert_eq!(event.kind(), "successful_login");
        assert_eq!(event.identity(), "editor");
        assert_eq!(event.occurred_at(), at);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let json = serde_json::to_string(&blocked()).unwrap();
        assert!(json.contains("\"kind\":\"blocked\""));
        assert!(json.contains("\"failed_attempts\":5"));
    }

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        assert!(TracingNotifier.notify(&blocked()).await.is_ok());
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        NoopSink.publish(blocked());
    }
}

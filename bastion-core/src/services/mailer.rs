#[cfg(feature = "mailer")]
pub use self::mailer_impl::*;

#[cfg(feature = "mailer")]
mod mailer_impl {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bastion_mailer::prelude::*;
    use chrono::{DateTime, Utc};

    use crate::{
        Error,
        config::NotificationConfig,
        error::{ConfigError, DispatchError},
        events::{NotificationEvent, Notifier},
    };

    /// Sends blocked and successful login notifications by email.
    pub struct MailerNotifier {
        transport: Arc<dyn Mailer>,
        engine: AskamaTemplateEngine,
        from_address: String,
        recipient: String,
        context: TemplateContext,
    }

    impl MailerNotifier {
        /// Build the transport from `config` and address mail to the
        /// notification recipient.
        pub fn new(config: MailerConfig, notifications: &NotificationConfig) -> Result<Self, Error> {
            let transport = config.build_transport().map_err(|e| {
                Error::Dispatch(DispatchError::DeliveryFailed(e.to_string()))
            })?;
            Self::with_transport(Arc::from(transport), config.get_from_address(), notifications)
        }

        pub fn from_env(notifications: &NotificationConfig) -> Result<Self, Error> {
            let config = MailerConfig::from_env().map_err(|e| ConfigError::InvalidValue {
                key: "mailer".to_string(),
                value: e.to_string(),
            })?;
            Self::new(config, notifications)
        }

        pub fn with_transport(
            transport: Arc<dyn Mailer>,
            from_address: impl Into<String>,
            notifications: &NotificationConfig,
        ) -> Result<Self, Error> {
            let recipient = notifications
                .recipient
                .clone()
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "BASTION_NOTIFY_EMAIL".to_string(),
                    value: String::new(),
                })?;

            Ok(Self {
                transport,
                engine: AskamaTemplateEngine::new(),
                from_address: from_address.into(),
                recipient,
                context: TemplateContext {
                    site_name: notifications.site_name.clone(),
                    site_url: notifications.site_url.clone(),
                },
            })
        }

        async fn build_email(&self, event: &NotificationEvent) -> Result<Email, MailerError> {
            match event {
                NotificationEvent::Blocked {
                    identity,
                    origin,
                    failed_attempts,
                    window,
                    occurred_at,
                } => {
                    let details = BlockedLoginDetails {
                        identity: identity.clone(),
                        origin: origin.clone(),
                        failed_attempts: *failed_attempts,
                        window: window.clone(),
                        occurred_at: format_time(occurred_at),
                    };
                    BlockedLoginEmail::build(
                        &self.engine,
                        &self.from_address,
                        &self.recipient,
                        self.context.clone(),
                        details,
                    )
                    .await
                }
                NotificationEvent::SuccessfulLogin {
                    identity,
                    origin,
                    roles,
                    user_agent,
                    occurred_at,
                } => {
                    let details = SuccessfulLoginDetails {
                        identity: identity.clone(),
                        origin: origin.clone(),
                        roles: roles.clone(),
                        user_agent: user_agent.clone(),
                        occurred_at: format_time(occurred_at),
                    };
                    SuccessfulLoginEmail::build(
                        &self.engine,
                        &self.from_address,
                        &self.recipient,
                        self.context.clone(),
                        details,
                    )
                    .await
                }
            }
        }
    }

    fn format_time(at: &DateTime<Utc>) -> String {
        at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    #[async_trait]
    impl Notifier for MailerNotifier {
        fn name(&self) -> &str {
            "email"
        }

        async fn notify(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
            let email = self
                .build_email(event)
                .await
                .map_err(|e| DispatchError::DeliveryFailed(e.to_string()))?;

            self.transport
                .send_email(email)
                .await
                .map_err(|e| DispatchError::DeliveryFailed(e.to_string()))?;

            tracing::debug!(kind = event.kind(), "Sent notification email");
            Ok(())
        }
    }

}

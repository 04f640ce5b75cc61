use crate::MailerError;
use serde::{Deserialize, Serialize};

/// A rendered notification ready for a transport.
///
/// Notifications always carry a plain-text body; the HTML alternative is
/// optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl Email {
    /// Start a notification addressed to a single recipient.
    pub fn notification(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            subject: subject.into(),
            text_body: None,
            html_body: None,
        }
    }

    pub fn also_to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    pub fn with_html(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Check the fields a transport cannot do without.
    pub fn validate(&self) -> Result<(), MailerError> {
        if self.from.trim().is_empty() {
            return Err(MailerError::Incomplete("sender"));
        }
        if self.to.iter().all(|to| to.trim().is_empty()) {
            return Err(MailerError::Incomplete("recipient"));
        }
        if self.subject.trim().is_empty() {
            return Err(MailerError::Incomplete("subject"));
        }
        if self.text_body.is_none() && self.html_body.is_none() {
            return Err(MailerError::Incomplete("body"));
        }
        Ok(())
    }
}

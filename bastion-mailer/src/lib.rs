//! Email delivery for bastion security notifications.
//!
//! Provides the [`Mailer`] transport abstraction, SMTP/file/sendmail transports
//! built on `lettre`, and askama templates for the two notifications the login
//! guard emits: a blocked login attempt and a successful login.
pub mod config;
pub mod email;
pub mod email_types;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transports;

pub use config::MailerConfig;
pub use email::Email;
pub use email_types::{BlockedLoginEmail, SuccessfulLoginEmail};
pub use error::MailerError;
pub use mailer::Mailer;
pub use templates::{
    AskamaTemplateEngine, BlockedLoginDetails, SuccessfulLoginDetails, TemplateContext,
    TemplateEngine,
};
pub use transports::{FileTransport, SendmailTransport, SmtpSecurity, SmtpTransport};

pub mod prelude {
    pub use crate::{
        AskamaTemplateEngine, BlockedLoginDetails, BlockedLoginEmail, Email,
        FileTransport, Mailer, MailerConfig, MailerError, SendmailTransport, SmtpTransport,
        SuccessfulLoginDetails, SuccessfulLoginEmail, TemplateContext, TemplateEngine,
    };
}

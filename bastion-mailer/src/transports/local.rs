//! Transports that hand mail to the local machine instead of a relay.

use super::{build_message, send_blocking};
use crate::{Email, Mailer, MailerError};
use async_trait::async_trait;
use lettre::transport::file::FileTransport as LettreFileTransport;
use lettre::transport::sendmail::SendmailTransport as LettreSendmailTransport;
use std::path::{Path, PathBuf};

/// Writes each notification to `<output_dir>/<message-id>.eml`.
#[derive(Debug, Clone)]
pub struct FileTransport {
    inner: LettreFileTransport,
    output_dir: PathBuf,
}

impl FileTransport {
    /// Creates `output_dir` if it does not exist yet.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, MailerError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            inner: LettreFileTransport::new(&output_dir),
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Mailer for FileTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        send_blocking(self.inner.clone(), build_message(email)?).await
    }
}

/// Pipes notifications to a sendmail-compatible binary.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    inner: LettreSendmailTransport,
}

impl SendmailTransport {
    /// Use `command`, or the system `sendmail` when `None`.
    pub fn new(command: Option<&str>) -> Self {
        let inner = match command {
            Some(command) => LettreSendmailTransport::new_with_command(command),
            None => LettreSendmailTransport::new(),
        };
        Self { inner }
    }
}

#[async_trait]
impl Mailer for SendmailTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        send_blocking(self.inner.clone(), build_message(email)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn successful_login() -> Email {
        Email::notification(
            "guard@example.com",
            "security@example.com",
            "Successful login - admin",
        )
        .with_text("admin signed in")
        .with_html("<p>admin signed in</p>")
    }

    #[tokio::test]
    async fn test_file_transport_writes_one_file_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileTransport::new(dir.path()).unwrap();

        transport.send_email(successful_login()).await.unwrap();
        transport.send_email(successful_login()).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_file_transport_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("outbox").join("security");
        let transport = FileTransport::new(&nested).unwrap();
        assert!(transport.output_dir().is_dir());
    }

    #[tokio::test]
    async fn test_sendmail_missing_binary() {
        let transport = SendmailTransport::new(Some("/nonexistent/bastion-sendmail"));
        let result = transport.send_email(successful_login()).await;
        assert!(matches!(result, Err(MailerError::Sendmail(_))));
    }
}

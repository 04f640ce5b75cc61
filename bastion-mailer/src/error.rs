use thiserror::Error;

/// Everything that can go wrong between a guard event and a delivered email.
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Notification email is missing its {0}")]
    Incomplete(&'static str),

    #[error("Failed to render notification: {0}")]
    Render(#[from] askama::Error),

    #[error("No notification template named {0}")]
    UnknownTemplate(String),

    #[error("Template data is missing {0}")]
    MissingTemplateData(String),

    #[error("Invalid template data: {0}")]
    TemplateData(#[from] serde_json::Error),

    #[error("Invalid text conversion pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to assemble message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Writing email file failed: {0}")]
    File(#[from] lettre::transport::file::Error),

    #[error("sendmail delivery failed: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),

    #[error("Mail worker stopped unexpectedly: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Invalid mailer configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

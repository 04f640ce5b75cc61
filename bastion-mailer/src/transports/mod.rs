mod local;
pub mod smtp;

pub use local::{FileTransport, SendmailTransport};
pub use smtp::{SmtpSecurity, SmtpTransport};

use crate::{Email, MailerError};
use lettre::Message;
use lettre::message::{MultiPart, SinglePart};

/// Turn a validated [`Email`] into a lettre [`Message`]. When both bodies
/// are present the message is `multipart/alternative`.
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    email.validate()?;

    let mut builder = Message::builder()
        .from(email.from.parse()?)
        .subject(email.subject);
    for to in email.to.iter().filter(|to| !to.trim().is_empty()) {
        builder = builder.to(to.parse()?);
    }

    let message = match (email.text_body, email.html_body) {
        (Some(text), Some(html)) => {
            builder.multipart(MultiPart::alternative_plain_html(text, html))?
        }
        (Some(text), None) => builder.singlepart(SinglePart::plain(text))?,
        (None, Some(html)) => builder.singlepart(SinglePart::html(html))?,
        (None, None) => return Err(MailerError::Incomplete("body")),
    };

    Ok(message)
}

/// Run a synchronous lettre transport off the async runtime.
pub(crate) async fn send_blocking<T>(transport: T, message: Message) -> Result<(), MailerError>
where
    T: lettre::Transport + Send + 'static,
    T::Error: Send + 'static,
    MailerError: From<T::Error>,
{
    tokio::task::spawn_blocking(move || transport.send(&message).map(drop))
        .await?
        .map_err(MailerError::from)
}

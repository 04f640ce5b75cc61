use crate::{FileTransport, Mailer, MailerError, SendmailTransport, SmtpSecurity, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where notification mail goes and who it claims to come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        #[serde(default)]
        security: SmtpSecurity,
    },
    File {
        output_dir: PathBuf,
    },
    Sendmail {
        command: Option<String>,
    },
}

impl MailerConfig {
    /// Read transport settings from `BASTION_SMTP_*`, `BASTION_MAIL_DIR` or
    /// `BASTION_SENDMAIL`, falling back to a file transport in `./emails`.
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = if let Some(host) = lookup("BASTION_SMTP_HOST") {
            let port = lookup("BASTION_SMTP_PORT")
                .map(|port| {
                    port.parse().map_err(|_| {
                        MailerError::Config(format!("BASTION_SMTP_PORT is not a port: {port}"))
                    })
                })
                .transpose()?;
            let security = lookup("BASTION_SMTP_TLS")
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or_default();

            TransportConfig::Smtp {
                host,
                port,
                username: lookup("BASTION_SMTP_USERNAME"),
                password: lookup("BASTION_SMTP_PASSWORD"),
                security,
            }
        } else if let Some(output_dir) = lookup("BASTION_MAIL_DIR") {
            TransportConfig::File {
                output_dir: PathBuf::from(output_dir),
            }
        } else if lookup("BASTION_SENDMAIL").is_some() {
            TransportConfig::Sendmail {
                command: lookup("BASTION_SENDMAIL_COMMAND"),
            }
        } else {
            TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            }
        };

        Ok(Self {
            transport,
            from_address: lookup("BASTION_MAIL_FROM")
                .unwrap_or_else(|| "bastion@localhost".to_string()),
            from_name: lookup("BASTION_MAIL_FROM_NAME"),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                security,
            } => {
                let credentials = username.clone().zip(password.clone());
                Ok(Box::new(SmtpTransport::relay(
                    host,
                    *port,
                    *security,
                    credentials,
                )?))
            }
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
            TransportConfig::Sendmail { command } => {
                Ok(Box::new(SendmailTransport::new(command.as_deref())))
            }
        }
    }

    /// The `From:` header value, e.g. `Bastion <bastion@localhost>`.
    pub fn get_from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "bastion@localhost".to_string(),
            from_name: Some("Bastion".to_string()),
        }
    }
}

//! Mail composition and transport.
//!
//! A [`MailConnector`] opens one [`Mailer`] session per run. The lettre-backed
//! connector relays over SMTP or drops `.eml` files into a pickup directory.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{MailConfig, MailTransportKind};
use crate::error::{DispatchError, Result};
use crate::models::PartitionFile;
use crate::validation::InputValidator;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A fully rendered message with one attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Recipient address
    pub to: String,
    /// Rendered subject line
    pub subject: String,
    /// Rendered plain-text body
    pub body: String,
    /// File to attach
    pub attachment: PathBuf,
    /// Attachment name shown to the recipient
    pub attachment_name: String,
}

/// An open mail session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message; no retries
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Opens a mail session for a run
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Acquire the session; failure here aborts the run
    async fn connect(&self) -> Result<Box<dyn Mailer>>;
}

/// Replace `{name}`, `{category}`, `{file_name}` and `{sender_name}` in a template
#[must_use]
pub fn render_template(template: &str, name: &str, category: &str, file_name: &str, sender_name: &str) -> String {
    template
        .replace("{name}", name)
        .replace("{category}", category)
        .replace("{file_name}", file_name)
        .replace("{sender_name}", sender_name)
}

/// Build the message for one partition file and recipient address
#[must_use]
pub fn compose(config: &MailConfig, to: &str, file: &PartitionFile) -> OutgoingMail {
    let file_name = file.file_name();
    let render = |template: &str| render_template(template, &file.stem, &file.column, &file_name, &config.sender_name);
    OutgoingMail {
        to: to.trim().to_string(),
        subject: render(&config.subject_template),
        body: render(&config.body_template),
        attachment: file.path.clone(),
        attachment_name: file_name.clone(),
    }
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Pickup(AsyncFileTransport<Tokio1Executor>),
}

/// Mailer backed by lettre
pub struct LettreMailer {
    transport: Transport,
    from: Mailbox,
}

impl LettreMailer {
    async fn build_message(&self, mail: &OutgoingMail) -> Result<Message> {
        InputValidator::validate_email(&mail.to)?;
        let to: Mailbox = mail.to.parse()?;

        let bytes = tokio::fs::read(&mail.attachment).await?;
        let content_type = ContentType::parse(XLSX_MIME).map_err(|e| DispatchError::Mail(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body.clone()))
                    .singlepart(Attachment::new(mail.attachment_name.clone()).body(bytes, content_type)),
            )?;
        Ok(message)
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = self.build_message(mail).await?;
        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| DispatchError::Mail(e.to_string()))?;
            }
            Transport::Pickup(pickup) => {
                let id = pickup.send(message).await.map_err(|e| DispatchError::Mail(e.to_string()))?;
                debug!(id = %id, "Dropped message into pickup directory");
            }
        }
        Ok(())
    }
}

/// Connector that opens a lettre transport from [`MailConfig`]
#[derive(Debug, Clone)]
pub struct LettreConnector {
    config: MailConfig,
}

impl LettreConnector {
    #[must_use]
    pub const fn new(config: MailConfig) -> Self {
        Self { config }
    }

    async fn open_smtp(&self) -> Result<Transport> {
        let cfg = &self.config;
        let unavailable = |e: &dyn std::fmt::Display| DispatchError::MailClientUnavailable(format!("{}: {e}", cfg.smtp_host));

        let mut builder = if cfg.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host).map_err(|e| unavailable(&e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.smtp_host)
        };
        builder = builder
            .port(cfg.smtp_port)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)));
        if let Some(username) = &cfg.smtp_username {
            let password = cfg.smtp_password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }
        let transport = builder.build();

        match transport.test_connection().await {
            Ok(true) => {
                info!(host = %cfg.smtp_host, port = cfg.smtp_port, "Connected to SMTP server");
                Ok(Transport::Smtp(transport))
            }
            Ok(false) => Err(unavailable(&"server did not accept the connection")),
            Err(e) => Err(unavailable(&e)),
        }
    }

    fn open_pickup(&self) -> Result<Transport> {
        let dir = Path::new(&self.config.pickup_directory);
        std::fs::create_dir_all(dir)
            .map_err(|e| DispatchError::MailClientUnavailable(format!("pickup directory {}: {e}", dir.display())))?;
        info!(directory = %dir.display(), "Using mail pickup directory");
        Ok(Transport::Pickup(AsyncFileTransport::<Tokio1Executor>::new(dir)))
    }
}

#[async_trait]
impl MailConnector for LettreConnector {
    async fn connect(&self) -> Result<Box<dyn Mailer>> {
        let from = Mailbox::new(
            Some(self.config.sender_name.clone()),
            self.config
                .from_address
                .parse::<Address>()
                .map_err(|e| DispatchError::MailClientUnavailable(format!("from address: {e}")))?,
        );

        let transport = match self.config.transport {
            MailTransportKind::Smtp => self.open_smtp().await?,
            MailTransportKind::Pickup => self.open_pickup()?,
        };

        Ok(Box::new(LettreMailer { transport, from }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn file() -> PartitionFile {
        PartitionFile {
            column: "AM Team Member".into(),
            value: "Alice".into(),
            stem: "Alice".into(),
            path: PathBuf::from("/tmp/Alice.xlsx"),
            rows: 2,
        }
    }

    #[test]
    fn test_compose_uses_default_templates() {
        let config = AppConfig::default().mail;
        let mail = compose(&config, " a@x.com ", &file());
        assert_eq!(mail.to, "a@x.com");
        assert_eq!(mail.subject, "Attached: Alice Data (AM Team Member)");
        assert!(mail.body.starts_with("Dear Alice,\n\nPlease find the attached file."));
        assert!(mail.body.ends_with("Your Name"));
        assert_eq!(mail.attachment_name, "Alice.xlsx");
    }

    #[tokio::test]
    async fn test_pickup_transport_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = dir.path().join("Alice.xlsx");
        std::fs::write(&attachment, b"PK\x03\x04").unwrap();

        let mut config = AppConfig::default().mail;
        config.pickup_directory = dir.path().join("outbox").to_string_lossy().into_owned();
        let mailer = LettreConnector::new(config.clone()).connect().await.unwrap();

        let mut part = file();
        part.path = attachment;
        mailer.send(&compose(&config, "a@x.com", &part)).await.unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("outbox")).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_address_fails_send() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default().mail;
        config.pickup_directory = dir.path().to_string_lossy().into_owned();
        let mailer = LettreConnector::new(config.clone()).connect().await.unwrap();

        let err = mailer.send(&compose(&config, "not-an-address", &file())).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_smtp_is_fatal() {
        let mut config = AppConfig::default().mail;
        config.transport = MailTransportKind::Smtp;
        config.smtp_host = "127.0.0.1".into();
        config.smtp_port = 1;
        config.starttls = false;
        config.timeout_secs = 2;

        let err = LettreConnector::new(config).connect().await.err().unwrap();
        assert!(matches!(err, DispatchError::MailClientUnavailable(_)));
    }
}

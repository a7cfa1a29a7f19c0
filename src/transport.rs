//! Mail transport — SMTP via lettre.

use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::error::TransportError;

/// An outbound message handed to the transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Receipt for an accepted message.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Transport collaborator for the delivery pipeline.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand a message to the mail system. Returns a receipt on acceptance.
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, TransportError>;

    /// Health check against the SMTP server.
    async fn verify(&self) -> bool;
}

/// SMTP mailer over lettre's sync transport, driven from `spawn_blocking`.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport, TransportError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        Ok(SmtpTransport::relay(&self.config.host)
            .map_err(|e| TransportError::Connection(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build())
    }
}

/// Build a lettre message with plain and HTML alternatives and an explicit
/// Message-ID.
fn build_message(email: &OutgoingEmail, message_id: &str) -> Result<Message, TransportError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|e| TransportError::InvalidAddress {
            address: email.from.clone(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| TransportError::InvalidAddress {
            address: email.to.clone(),
            reason: format!("{e}"),
        })?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .message_id(Some(message_id.to_string()))
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .map_err(|e| TransportError::MessageBuild(format!("{e}")))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, TransportError> {
        let message_id = format!("<{}@mailhub>", Uuid::new_v4());
        let message = build_message(email, &message_id)?;
        let transport = self.build_transport()?;

        let to = email.to.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| TransportError::SendFailed(format!("send task panicked: {e}")))?
            .map_err(|e| TransportError::SendFailed(format!("SMTP send failed: {e}")))?;

        info!(to = %to, message_id = %message_id, "Email sent");
        Ok(SendReceipt { message_id })
    }

    async fn verify(&self) -> bool {
        let transport = match self.build_transport() {
            Ok(t) => t,
            Err(_) => return false,
        };
        tokio::task::spawn_blocking(move || transport.test_connection().unwrap_or(false))
            .await
            .unwrap_or(false)
    }
}

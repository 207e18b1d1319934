//! Outgoing mail
//!
//! One-shot authenticated SMTP submission. Nothing is queued or retried:
//! a failed send is reported to the caller and forgotten.

use async_trait::async_trait;
use drip_common::config::MailerConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Account the message is sent from and authenticated as
#[derive(Debug, Clone)]
pub struct SenderAccount {
    pub email: String,
    pub password: String,
}

/// A message to deliver
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Delivers a single message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, sender: &SenderAccount, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// Build a plain-text message
pub fn build_message(sender: &SenderAccount, email: &OutgoingEmail) -> Result<Message, MailerError> {
    let from: Mailbox = sender
        .email
        .parse()
        .map_err(|_| MailerError::InvalidAddress(sender.email.clone()))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|_| MailerError::InvalidAddress(email.to.clone()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| MailerError::Build(e.to_string()))
}

/// SMTP mailer using STARTTLS and the sender's credentials
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, sender: &SenderAccount, email: &OutgoingEmail) -> Result<(), MailerError> {
        let message = build_message(sender, email)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| MailerError::Transport(format!("Failed to create SMTP transport: {}", e)))?
            .port(self.port)
            .credentials(Credentials::new(
                sender.email.clone(),
                sender.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        debug!(host = %self.host, port = self.port, to = %email.to, "Submitting message");

        let response = transport
            .send(message)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        info!(to = %email.to, code = %response.code(), "Message accepted by relay");
        Ok(())
    }
}

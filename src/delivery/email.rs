//! SMTP delivery.
//!
//! Port 465 connects with implicit TLS; any other port upgrades with STARTTLS.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::error::DeliveryError;

/// Port that expects TLS from the first byte; every other port uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends the digest over SMTP.
#[derive(Debug, Clone)]
pub struct EmailSender {
    smtp_server: String,
    smtp_port: u16,
    address: String,
    password: String,
    recipients: Vec<String>,
    subject_prefix: String,
}

impl EmailSender {
    /// `None` unless sender address, password and recipients are all set.
    pub fn from_config(config: &EmailConfig) -> Option<Self> {
        let address = config.address.as_deref()?.trim();
        let password = config.password.as_deref()?;
        if address.is_empty() || password.is_empty() || config.recipients.is_empty() {
            return None;
        }

        Some(Self {
            smtp_server: config.smtp_server.clone(),
            smtp_port: config.smtp_port,
            address: address.to_string(),
            password: password.to_string(),
            recipients: config.recipients.clone(),
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    pub fn subject(&self, date: &str) -> String {
        format!("{} - {}", self.subject_prefix, date)
    }

    /// Build a multipart/alternative message with text and HTML bodies.
    pub fn build_message(&self, date: &str, text: String, html: String) -> Result<Message, DeliveryError> {
        if self.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }

        let from: Mailbox = self.address.parse()?;
        let mut builder = Message::builder().from(from).subject(self.subject(date));
        for recipient in &self.recipients {
            builder = builder.to(recipient.trim().parse::<Mailbox>()?);
        }

        Ok(builder.multipart(MultiPart::alternative_plain_html(text, html))?)
    }

    /// Send the digest to every recipient.
    pub async fn send(&self, date: &str, text: String, html: String) -> Result<(), DeliveryError> {
        let message = self.build_message(date, text, html)?;

        let builder = if self.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_server)?
        };
        let mailer = builder
            .port(self.smtp_port)
            .credentials(Credentials::new(self.address.clone(), self.password.clone()))
            .build();

        debug!("Connecting to {}:{}", self.smtp_server, self.smtp_port);
        mailer.send(message).await?;
        info!("Email sent to {}", self.recipients.join(", "));
        Ok(())
    }
}

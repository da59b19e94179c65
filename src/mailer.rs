//! Digest delivery.
//!
//! [`DigestMailer`] is the seam between the scheduler and the outside world.
//! [`SmtpMailer`] delivers over an authenticated STARTTLS relay; [`LogMailer`]
//! stands in when no SMTP settings are configured and only records what
//! would have been sent.

use crate::error::MailError;
use crate::outputs::email::DigestEmail;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use tracing::{info, instrument};

/// Delivers composed digests.
pub trait DigestMailer: Send + Sync {
    fn send_digest(&self, email: &DigestEmail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// SMTP relay settings, usually from `SMTP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; the username when not set.
    pub from: String,
}

impl SmtpSettings {
    /// Assemble settings from optional parts.
    ///
    /// # Returns
    ///
    /// `None` unless server, username and password are all present and
    /// non-empty.
    pub fn from_parts(
        server: Option<String>,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let server = non_empty(server)?;
        let username = non_empty(username)?;
        let password = non_empty(password)?;
        let from = non_empty(from).unwrap_or_else(|| username.clone());
        Some(Self {
            server,
            port,
            username,
            password,
            from,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|e| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build the multipart message for `email` sent from `from`.
pub fn build_message(from: &Mailbox, email: &DigestEmail) -> Result<Message, MailError> {
    let to = parse_mailbox(&email.to)?;
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))?;
    Ok(message)
}

/// Delivers digests through an SMTP relay using STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let from = parse_mailbox(&settings.from)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        info!(server = %settings.server, port = settings.port, from = %from, "SMTP mailer configured");
        Ok(Self { transport, from })
    }
}

impl DigestMailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(to = %email.to))]
    async fn send_digest(&self, email: &DigestEmail) -> Result<(), MailError> {
        let message = build_message(&self.from, email)?;
        let response = self.transport.send(message).await?;
        info!(code = %response.code(), subject = %email.subject, "Digest sent");
        Ok(())
    }
}

/// Logs digests instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl DigestMailer for LogMailer {
    async fn send_digest(&self, email: &DigestEmail) -> Result<(), MailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            text_bytes = email.text_body.len(),
            html_bytes = email.html_body.len(),
            "SMTP not configured; digest logged instead of sent"
        );
        Ok(())
    }
}

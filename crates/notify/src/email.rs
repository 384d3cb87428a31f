//! SMTP mailer via `lettre` with TLS support.
//!
//! Delivers reminders as multipart (plain + HTML) emails through an SMTP
//! server over STARTTLS or implicit TLS.

use duewatch_core::MailConfig;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::traits::{Mailer, NotifyError, OutgoingEmail};

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with `STARTTLS` before authenticating.
    StartTls,
    /// TLS from the first byte (SMTPS).
    ImplicitTls,
}

impl SmtpSecurity {
    pub fn for_config(config: &MailConfig) -> Self {
        if config.use_tls {
            Self::StartTls
        } else {
            Self::ImplicitTls
        }
    }
}

/// Sends reminder emails via SMTP.
#[derive(Debug)]
pub struct SmtpMailer {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox, also used as `To` when a message has no recipients.
    from: Mailbox,
}

impl SmtpMailer {
    /// Build an `SmtpMailer` from the mail section of the process config.
    ///
    /// `use_tls` selects STARTTLS, otherwise the connection uses implicit
    /// TLS on the configured port. Credentials are attached only when both
    /// username and password are configured.
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotifyError::Config("SMTP_HOST is not set".to_string()))?;

        let from = parse_mailbox(&config.sender_mailbox())?;

        let mut builder = match SmtpSecurity::for_config(config) {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SmtpSecurity::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        }
        .map_err(|e| NotifyError::Config(e.to_string()))?
        .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Assemble the lettre message for `email`.
    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone());

        if email.to.is_empty() {
            builder = builder.to(self.from.clone());
        }
        for addr in &email.to {
            builder = builder.to(parse_mailbox(addr)?);
        }
        for addr in &email.cc {
            builder = builder.cc(parse_mailbox(addr)?);
        }
        for addr in &email.bcc {
            builder = builder.bcc(parse_mailbox(addr)?);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::Address {
            address: addr.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            transport = "smtp",
            subject = %email.subject,
            recipients = email.recipient_count(),
            "reminder email delivered"
        );

        Ok(())
    }

    fn transport_name(&self) -> &str {
        "smtp"
    }
}

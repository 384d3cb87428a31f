//! Mailer that performs no network I/O.
//!
//! Used when `EMAIL_DRY_RUN` is set or no SMTP server is configured. Every
//! send succeeds and is logged, so the dispatch engine and its delivery log
//! behave exactly as they would against a real server.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::{Mailer, NotifyError, OutgoingEmail};

#[derive(Debug, Default)]
pub struct DryRunMailer {
    sent: AtomicU64,
}

impl DryRunMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages "sent" so far.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Mailer for DryRunMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            to = ?email.to,
            cc = ?email.cc,
            bcc = ?email.bcc,
            subject = %email.subject,
            "[DRY RUN] would send email"
        );
        tracing::debug!(body = %email.html_body, "[DRY RUN] html body");
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds_and_counts() {
        let mailer = DryRunMailer::new();
        let email = OutgoingEmail {
            to: vec![],
            cc: vec![],
            bcc: vec![],
            subject: "s".to_string(),
            html_body: String::new(),
            text_body: String::new(),
        };
        assert!(mailer.send(&email).await.is_ok());
        assert!(mailer.send(&email).await.is_ok());
        assert_eq!(mailer.sent_count(), 2);
        assert_eq!(mailer.transport_name(), "dry-run");
    }
}

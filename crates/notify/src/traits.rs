//! Mailer trait definition and shared error types.

/// Errors that can occur during mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },
}

/// A fully composed reminder email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// Delivered to but never rendered as a header.
    pub bcc: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl OutgoingEmail {
    /// Total number of envelope recipients.
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// Trait for mail transport implementations.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message. Blocks the calling task for the network exchange.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;

    /// Human-readable name for this transport (e.g., "smtp", "dry-run").
    fn transport_name(&self) -> &str;
}

/// Outcome of a single delivery attempt, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub transport: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DeliveryResult {
    /// The error text when the attempt failed.
    pub fn into_error(self) -> Option<String> {
        if self.success {
            None
        } else {
            Some(self.error.unwrap_or_else(|| "unknown delivery error".to_string()))
        }
    }
}

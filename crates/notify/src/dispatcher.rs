//! Delivers composed reminders through the configured transport.
//!
//! The dispatcher never propagates a transport error: every attempt ends in
//! a [`DeliveryResult`], so a scan can keep going across schedules and the
//! engine records the failure in the delivery log instead.

use std::sync::Arc;

use crate::traits::{DeliveryResult, Mailer, OutgoingEmail};

#[derive(Clone)]
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn transport_name(&self) -> &str {
        self.mailer.transport_name()
    }

    /// Send `email` once and report the outcome.
    pub async fn dispatch(&self, email: &OutgoingEmail) -> DeliveryResult {
        let start = std::time::Instant::now();
        let result = self.mailer.send(email).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let transport = self.mailer.transport_name().to_string();

        match result {
            Ok(()) => {
                tracing::debug!(
                    transport = %transport,
                    subject = %email.subject,
                    duration_ms,
                    "reminder delivered"
                );
                DeliveryResult {
                    transport,
                    success: true,
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                tracing::warn!(
                    transport = %transport,
                    subject = %email.subject,
                    error = %e,
                    duration_ms,
                    "reminder delivery failed"
                );
                DeliveryResult {
                    transport,
                    success: false,
                    error: Some(e.to_string()),
                    duration_ms,
                }
            }
        }
    }
}

//! Outbound mail for due-date reminders.
//!
//! This crate provides:
//! - `Mailer` trait for pluggable mail transports
//! - SMTP (lettre) and dry-run transport implementations
//! - Minijinja rendering of the fixed reminder templates
//! - Dispatcher that turns transport errors into delivery results

pub mod dispatcher;
pub mod dry_run;
pub mod email;
pub mod templating;
pub mod traits;

use std::sync::Arc;

use duewatch_core::MailConfig;

pub use dispatcher::Dispatcher;
pub use dry_run::DryRunMailer;
pub use email::{SmtpMailer, SmtpSecurity};
pub use templating::{ReminderComposer, ReminderContext};
pub use traits::{DeliveryResult, Mailer, NotifyError, OutgoingEmail};

/// Pick the transport for `config`: dry-run when requested or when no SMTP
/// host is configured, SMTP otherwise.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, NotifyError> {
    if config.dry_run || !config.is_configured() {
        if !config.dry_run {
            tracing::warn!("SMTP host or sender not configured, falling back to dry-run mail");
        }
        return Ok(Arc::new(DryRunMailer::new()));
    }
    Ok(Arc::new(SmtpMailer::from_config(config)?))
}

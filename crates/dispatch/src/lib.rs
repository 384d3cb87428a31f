//! Reminder dispatch for recurring reporting deadlines.
//!
//! This crate provides:
//! - `ReminderEngine`: daily scan, missed-window backfill and due-day send
//! - Exponential-backoff retry of failed deliveries
//! - `DailyDriver`: the cron-timed loop that runs the daily scan

pub mod driver;
pub mod engine;
pub mod retry;

pub use driver::{daily_cron_expression, DailyDriver};
pub use engine::{candidate_due_dates, DispatchError, ReminderEngine, ScanReport};
pub use retry::{backoff_delay, retry_due_at, RetryReport};

//! Exponential-backoff retry of failed deliveries.
//!
//! A `FAILED` row becomes eligible again `base * 2^retry_count` minutes after
//! its last attempt, until `retry_count` reaches the configured ceiling.
//! Rows at the ceiling stay `FAILED` and are only visible in the log listing.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use duewatch_core::{LogFilter, ReminderLog, ReminderStatus};
use duewatch_store::StoreError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{DispatchError, ReminderEngine};

/// Counters for one retry pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    /// `FAILED` rows looked at.
    pub examined: usize,
    pub recovered: usize,
    pub still_failing: usize,
    /// At the attempt ceiling.
    pub exhausted: usize,
    /// Backoff not yet elapsed.
    pub not_due: usize,
    /// Schedule gone or inactive, or the reminder was already sent.
    pub skipped: usize,
    pub duplicates_rejected: usize,
    pub errors: usize,
}

impl RetryReport {
    pub fn retried(&self) -> usize {
        self.recovered + self.still_failing + self.duplicates_rejected
    }
}

impl fmt::Display for RetryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined={} recovered={} still_failing={} exhausted={} not_due={} skipped={} errors={}",
            self.examined,
            self.recovered,
            self.still_failing,
            self.exhausted,
            self.not_due,
            self.skipped,
            self.errors
        )
    }
}

enum RetryOutcome {
    Recovered,
    StillFailing,
    Skipped(&'static str),
    Duplicate,
}

/// Wait required before retry number `retry_count + 1`.
///
/// `base_minutes * 2^retry_count`, saturating at the largest representable
/// delay instead of overflowing.
pub fn backoff_delay(base_minutes: u32, retry_count: u32) -> TimeDelta {
    let factor = 2i64.checked_pow(retry_count).unwrap_or(i64::MAX);
    let minutes = i64::from(base_minutes).saturating_mul(factor);
    TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX)
}

/// Earliest instant `log` may be retried, or `None` if that lies beyond the
/// representable range.
pub fn retry_due_at(log: &ReminderLog, base_minutes: u32) -> Option<DateTime<Utc>> {
    log.sent_at
        .checked_add_signed(backoff_delay(base_minutes, log.retry_count))
}

impl ReminderEngine {
    pub async fn retry_failed(&self) -> Result<RetryReport, DispatchError> {
        self.retry_failed_at(Utc::now()).await
    }

    /// Retry every `FAILED` row whose backoff has elapsed at `now`.
    pub async fn retry_failed_at(&self, now: DateTime<Utc>) -> Result<RetryReport, DispatchError> {
        let max_attempts = self.config.max_retry_attempts;
        let base = self.config.retry_backoff_base_minutes;
        let failed = self
            .store
            .list_logs(&LogFilter::with_status(ReminderStatus::Failed))
            .await?;

        let mut report = RetryReport::default();
        for mut log in failed {
            report.examined += 1;
            if log.retry_count >= max_attempts {
                report.exhausted += 1;
                continue;
            }
            if !retry_due_at(&log, base).is_some_and(|due_at| now >= due_at) {
                report.not_due += 1;
                continue;
            }

            match self.retry_one(&mut log, now).await {
                Ok(RetryOutcome::Recovered) => report.recovered += 1,
                Ok(RetryOutcome::StillFailing) => report.still_failing += 1,
                Ok(RetryOutcome::Duplicate) => report.duplicates_rejected += 1,
                Ok(RetryOutcome::Skipped(reason)) => {
                    debug!(log_id = log.id, key = %log.key(), reason, "retry skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(log_id = log.id, error = %e, "retry failed");
                }
            }
        }

        if report.examined > 0 {
            info!(%report, "retry pass finished");
        }
        Ok(report)
    }

    async fn retry_one(
        &self,
        log: &mut ReminderLog,
        now: DateTime<Utc>,
    ) -> Result<RetryOutcome, DispatchError> {
        let key = log.key();
        let Some(schedule) = self.store.get_schedule(log.schedule_id).await? else {
            return Ok(RetryOutcome::Skipped("schedule deleted"));
        };
        if !schedule.active {
            return Ok(RetryOutcome::Skipped("schedule inactive"));
        }
        if self.store.find_log(&LogFilter::sent_for(key)).await?.is_some() {
            return Ok(RetryOutcome::Skipped("already sent"));
        }

        let error = self.deliver(&schedule, key).await;
        log.record_retry(now, error);

        match self.store.update_log(log).await {
            Ok(()) if log.status == ReminderStatus::Sent => {
                info!(%key, log_id = log.id, attempt = log.retry_count, "retry delivered");
                Ok(RetryOutcome::Recovered)
            }
            Ok(()) => {
                warn!(
                    %key,
                    log_id = log.id,
                    attempt = log.retry_count,
                    error = ?log.error_message,
                    "retry failed again"
                );
                Ok(RetryOutcome::StillFailing)
            }
            Err(StoreError::DuplicateSent(key)) => {
                warn!(%key, log_id = log.id, "retry raced with another send");
                Ok(RetryOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn failed_log(retry_count: u32, sent_at: DateTime<Utc>) -> ReminderLog {
        ReminderLog {
            id: 1,
            schedule_id: 1,
            planned_due_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            reminder_offset_days: 7,
            status: ReminderStatus::Failed,
            error_message: Some("timeout".to_string()),
            sent_at,
            backfilled: false,
            retry_count,
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(backoff_delay(5, 0), TimeDelta::minutes(5));
        assert_eq!(backoff_delay(5, 1), TimeDelta::minutes(10));
        assert_eq!(backoff_delay(5, 2), TimeDelta::minutes(20));
        assert_eq!(backoff_delay(0, 3), TimeDelta::zero());
    }

    #[test]
    fn delay_saturates() {
        assert_eq!(backoff_delay(u32::MAX, 64), TimeDelta::MAX);
        assert_eq!(backoff_delay(5, 200), TimeDelta::MAX);
    }

    #[test]
    fn due_at_is_last_attempt_plus_delay() {
        let t = Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap();
        let log = failed_log(2, t);
        assert_eq!(retry_due_at(&log, 5), Some(t + TimeDelta::minutes(20)));
    }

    #[test]
    fn due_at_overflow_is_none() {
        let t = Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap();
        assert_eq!(retry_due_at(&failed_log(100, t), 5), None);
    }
}

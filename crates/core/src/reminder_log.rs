//! Delivery log entries: one row per attempted reminder instance.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DuewatchError;

/// Outcome of the latest delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Sent => "SENT",
            ReminderStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = DuewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SENT" => Ok(ReminderStatus::Sent),
            "FAILED" => Ok(ReminderStatus::Failed),
            other => Err(DuewatchError::UnknownStatus(other.to_string())),
        }
    }
}

/// (schedule, due date, offset): identifies one logical reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderKey {
    pub schedule_id: i64,
    pub planned_due_date: NaiveDate,
    pub reminder_offset_days: u32,
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schedule={} due={} offset={}",
            self.schedule_id, self.planned_due_date, self.reminder_offset_days
        )
    }
}

/// A persisted delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderLog {
    pub id: i64,
    pub schedule_id: i64,
    pub planned_due_date: NaiveDate,
    pub reminder_offset_days: u32,
    pub status: ReminderStatus,
    /// Present iff `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Time of the latest attempt.
    pub sent_at: DateTime<Utc>,
    pub backfilled: bool,
    pub retry_count: u32,
}

impl ReminderLog {
    pub fn key(&self) -> ReminderKey {
        ReminderKey {
            schedule_id: self.schedule_id,
            planned_due_date: self.planned_due_date,
            reminder_offset_days: self.reminder_offset_days,
        }
    }

    /// Record the outcome of a retry attempt made at `at`.
    pub fn record_retry(&mut self, at: DateTime<Utc>, error: Option<String>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.sent_at = at;
        match error {
            None => {
                self.status = ReminderStatus::Sent;
                self.error_message = None;
            }
            Some(e) => {
                self.status = ReminderStatus::Failed;
                self.error_message = Some(e);
            }
        }
    }
}

/// A log row about to be inserted for a first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminderLog {
    pub key: ReminderKey,
    pub status: ReminderStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub backfilled: bool,
}

impl NewReminderLog {
    /// Build the row for a first attempt from the transport outcome.
    pub fn attempt(
        key: ReminderKey,
        at: DateTime<Utc>,
        error: Option<String>,
        backfilled: bool,
    ) -> Self {
        let status = if error.is_none() {
            ReminderStatus::Sent
        } else {
            ReminderStatus::Failed
        };
        Self {
            key,
            status,
            error_message: error,
            sent_at: at,
            backfilled,
        }
    }
}

/// Exact-match filters for log queries; `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub schedule_id: Option<i64>,
    pub planned_due_date: Option<NaiveDate>,
    pub reminder_offset_days: Option<u32>,
    pub status: Option<ReminderStatus>,
    /// Inclusive lower bound on `sent_at`.
    pub sent_since: Option<DateTime<Utc>>,
}

impl LogFilter {
    /// Rows recorded as `SENT` for exactly this reminder.
    pub fn sent_for(key: ReminderKey) -> Self {
        Self {
            schedule_id: Some(key.schedule_id),
            planned_due_date: Some(key.planned_due_date),
            reminder_offset_days: Some(key.reminder_offset_days),
            status: Some(ReminderStatus::Sent),
            sent_since: None,
        }
    }

    pub fn with_status(status: ReminderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.sent_since = Some(at);
        self
    }

    pub fn matches(&self, log: &ReminderLog) -> bool {
        self.schedule_id.map_or(true, |id| log.schedule_id == id)
            && self
                .planned_due_date
                .map_or(true, |d| log.planned_due_date == d)
            && self
                .reminder_offset_days
                .map_or(true, |o| log.reminder_offset_days == o)
            && self.status.map_or(true, |s| log.status == s)
            && self.sent_since.map_or(true, |t| log.sent_at >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key() -> ReminderKey {
        ReminderKey {
            schedule_id: 4,
            planned_due_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            reminder_offset_days: 7,
        }
    }

    fn failed_log() -> ReminderLog {
        ReminderLog {
            id: 1,
            schedule_id: 4,
            planned_due_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            reminder_offset_days: 7,
            status: ReminderStatus::Failed,
            error_message: Some("connection refused".to_string()),
            sent_at: Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap(),
            backfilled: false,
            retry_count: 0,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("sent".parse::<ReminderStatus>().unwrap(), ReminderStatus::Sent);
        assert_eq!("FAILED".parse::<ReminderStatus>().unwrap(), ReminderStatus::Failed);
        assert!("pending".parse::<ReminderStatus>().is_err());
    }

    #[test]
    fn attempt_sets_status_from_error() {
        let at = Utc::now();
        let ok = NewReminderLog::attempt(key(), at, None, false);
        assert_eq!(ok.status, ReminderStatus::Sent);
        assert!(ok.error_message.is_none());

        let bad = NewReminderLog::attempt(key(), at, Some("boom".to_string()), true);
        assert_eq!(bad.status, ReminderStatus::Failed);
        assert_eq!(bad.error_message.as_deref(), Some("boom"));
        assert!(bad.backfilled);
    }

    #[test]
    fn record_retry_success_clears_error() {
        let mut log = failed_log();
        let at = Utc.with_ymd_and_hms(2025, 3, 8, 2, 0, 0).unwrap();
        log.record_retry(at, None);
        assert_eq!(log.status, ReminderStatus::Sent);
        assert_eq!(log.error_message, None);
        assert_eq!(log.retry_count, 1);
        assert_eq!(log.sent_at, at);
    }

    #[test]
    fn record_retry_failure_keeps_failed() {
        let mut log = failed_log();
        log.record_retry(Utc::now(), Some("timeout".to_string()));
        assert_eq!(log.status, ReminderStatus::Failed);
        assert_eq!(log.error_message.as_deref(), Some("timeout"));
        assert_eq!(log.retry_count, 1);
    }

    #[test]
    fn filter_matches_exact_key_and_lower_bound() {
        let log = failed_log();
        assert!(LogFilter::default().matches(&log));
        assert!(!LogFilter::sent_for(key()).matches(&log));
        assert!(LogFilter::with_status(ReminderStatus::Failed).matches(&log));

        let later = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        assert!(!LogFilter::with_status(ReminderStatus::Failed)
            .since(later)
            .matches(&log));
        assert!(LogFilter::default().since(log.sent_at).matches(&log));
    }

    #[test]
    fn json_shape_used_by_log_listing() {
        let mut log = failed_log();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["planned_due_date"], "2025-03-15");
        assert_eq!(json["error_message"], "connection refused");

        log.record_retry(log.sent_at, None);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["status"], "SENT");
        assert!(json.get("error_message").is_none());
    }
}

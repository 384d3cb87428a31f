//! Recurring reporting obligations and the parsers for their text fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DuewatchError;

/// A recurring (or one-off) reporting obligation of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub entity_name: String,
    pub report_name: String,
    pub description: Option<String>,
    /// A known occurrence; every other occurrence is derived from it.
    pub anchor_due_date: NaiveDate,
    /// 0 = one-off, otherwise the step between occurrences in months.
    pub interval_months: u32,
    pub recipient_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    /// Days before the due date; `None` falls back to the process default.
    pub reminder_offsets_days: Option<Vec<u32>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Schedule-specific offsets when present and non-empty, else `default`.
    pub fn effective_offsets<'a>(&'a self, default: &'a [u32]) -> &'a [u32] {
        match self.reminder_offsets_days.as_deref() {
            Some(offsets) if !offsets.is_empty() => offsets,
            _ => default,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.interval_months > 0
    }

    /// Copy the editable fields of `draft` onto this schedule.
    pub fn apply(&mut self, draft: NewSchedule) {
        self.entity_name = draft.entity_name;
        self.report_name = draft.report_name;
        self.description = draft.description;
        self.anchor_due_date = draft.anchor_due_date;
        self.interval_months = draft.interval_months;
        self.recipient_emails = draft.recipient_emails;
        self.cc_emails = draft.cc_emails;
        self.reminder_offsets_days = draft.reminder_offsets_days;
        self.active = draft.active;
    }
}

/// Editable fields of a schedule, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub entity_name: String,
    pub report_name: String,
    pub description: Option<String>,
    pub anchor_due_date: NaiveDate,
    pub interval_months: u32,
    pub recipient_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub reminder_offsets_days: Option<Vec<u32>>,
    pub active: bool,
}

impl NewSchedule {
    /// Trim free-text fields and reject drafts that cannot be reminded about.
    pub fn normalized(mut self) -> Result<Self, DuewatchError> {
        self.entity_name = self.entity_name.trim().to_string();
        self.report_name = self.report_name.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        if self.entity_name.is_empty() {
            return Err(DuewatchError::InvalidSchedule(
                "entity name is required".to_string(),
            ));
        }
        if self.report_name.is_empty() {
            return Err(DuewatchError::InvalidSchedule(
                "report name is required".to_string(),
            ));
        }
        if let Some(offsets) = self.reminder_offsets_days.take() {
            self.reminder_offsets_days = normalize_offsets(offsets);
        }
        Ok(self)
    }
}

/// Split a comma-delimited address list, trimming and dropping blanks.
pub fn parse_email_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Inverse of [`parse_email_list`], used for storage and display.
pub fn join_email_list(emails: &[String]) -> String {
    emails.join(", ")
}

/// Parse `"7,3,1,0"` style offset lists.
///
/// Items that are not non-negative integers are dropped rather than failing
/// the whole list. The result is de-duplicated and sorted descending
/// (furthest-before-due first). Returns `None` when nothing valid remains.
pub fn parse_offsets(text: &str) -> Option<Vec<u32>> {
    let parsed: Vec<u32> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok())
        .collect();
    normalize_offsets(parsed)
}

fn normalize_offsets(mut offsets: Vec<u32>) -> Option<Vec<u32>> {
    offsets.sort_unstable_by(|a, b| b.cmp(a));
    offsets.dedup();
    if offsets.is_empty() {
        None
    } else {
        Some(offsets)
    }
}

pub fn join_offsets(offsets: &[u32]) -> String {
    offsets
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(text: &str) -> Result<NaiveDate, DuewatchError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| DuewatchError::InvalidDate(text.to_string()))
}

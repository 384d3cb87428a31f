use duewatch_core::{LogFilter, NewReminderLog, NewSchedule, ReminderLog, Schedule};

use crate::error::StoreError;

/// Record store for schedules and reminder logs.
///
/// Every method is a single committed write or read; nothing is batched, so
/// a crash between two calls loses at most the call in flight.
#[async_trait::async_trait]
pub trait ReminderStore: Send + Sync {
    /// Insert a schedule and return it with its assigned id and timestamps.
    async fn create_schedule(&self, draft: NewSchedule) -> Result<Schedule, StoreError>;

    async fn get_schedule(&self, id: i64) -> Result<Option<Schedule>, StoreError>;

    /// Schedules ordered by entity then report name; `active` filters when set.
    async fn list_schedules(&self, active: Option<bool>) -> Result<Vec<Schedule>, StoreError>;

    /// Persist the editable fields of `schedule`, bumping `updated_at`.
    async fn update_schedule(&self, schedule: &Schedule) -> Result<Schedule, StoreError>;

    /// Delete a schedule and its logs. Returns `false` if it did not exist.
    async fn delete_schedule(&self, id: i64) -> Result<bool, StoreError>;

    /// First log row (lowest id) matching `filter`.
    async fn find_log(&self, filter: &LogFilter) -> Result<Option<ReminderLog>, StoreError>;

    /// All rows matching `filter`, oldest first.
    async fn list_logs(&self, filter: &LogFilter) -> Result<Vec<ReminderLog>, StoreError>;

    /// Up to `limit` rows matching `filter`, most recent attempt first.
    async fn recent_logs(
        &self,
        filter: &LogFilter,
        limit: u32,
    ) -> Result<Vec<ReminderLog>, StoreError>;

    /// Insert a first-attempt row.
    ///
    /// Fails with [`StoreError::DuplicateSent`] when `entry` is `SENT` and a
    /// `SENT` row for the same reminder already exists.
    async fn insert_log(&self, entry: NewReminderLog) -> Result<ReminderLog, StoreError>;

    /// Overwrite a row in place (retry bookkeeping). Same uniqueness rule
    /// as [`insert_log`](ReminderStore::insert_log).
    async fn update_log(&self, log: &ReminderLog) -> Result<(), StoreError>;
}

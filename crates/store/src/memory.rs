//! In-process store for tests and throwaway runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use duewatch_core::{
    LogFilter, NewReminderLog, NewSchedule, ReminderKey, ReminderLog, ReminderStatus, Schedule,
};

use crate::error::StoreError;
use crate::traits::ReminderStore;

#[derive(Debug, Default)]
struct State {
    next_schedule_id: i64,
    next_log_id: i64,
    schedules: BTreeMap<i64, Schedule>,
    logs: BTreeMap<i64, ReminderLog>,
}

impl State {
    /// Whether a `SENT` row other than `except` exists for `key`.
    fn has_other_sent(&self, key: ReminderKey, except: Option<i64>) -> bool {
        self.logs.values().any(|log| {
            Some(log.id) != except && log.status == ReminderStatus::Sent && log.key() == key
        })
    }
}

/// Keeps everything in memory behind a `RwLock`. Same semantics as the
/// SQLite store, including the one-`SENT`-row-per-reminder rule.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ReminderStore for MemoryStore {
    async fn create_schedule(&self, draft: NewSchedule) -> Result<Schedule, StoreError> {
        let mut state = self.state.write().expect("store lock poisoned");
        state.next_schedule_id += 1;
        let now = Utc::now();
        let schedule = Schedule {
            id: state.next_schedule_id,
            entity_name: draft.entity_name,
            report_name: draft.report_name,
            description: draft.description,
            anchor_due_date: draft.anchor_due_date,
            interval_months: draft.interval_months,
            recipient_emails: draft.recipient_emails,
            cc_emails: draft.cc_emails,
            reminder_offsets_days: draft.reminder_offsets_days,
            active: draft.active,
            created_at: now,
            updated_at: now,
        };
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: i64) -> Result<Option<Schedule>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self, active: Option<bool>) -> Result<Vec<Schedule>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        let mut schedules: Vec<Schedule> = state
            .schedules
            .values()
            .filter(|s| active.map_or(true, |a| s.active == a))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| {
            (&a.entity_name, &a.report_name, a.id).cmp(&(&b.entity_name, &b.report_name, b.id))
        });
        Ok(schedules)
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<Schedule, StoreError> {
        let mut state = self.state.write().expect("store lock poisoned");
        let stored = state
            .schedules
            .get_mut(&schedule.id)
            .ok_or(StoreError::ScheduleNotFound(schedule.id))?;
        let created_at = stored.created_at;
        *stored = schedule.clone();
        stored.created_at = created_at;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_schedule(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().expect("store lock poisoned");
        if state.schedules.remove(&id).is_none() {
            return Ok(false);
        }
        state.logs.retain(|_, log| log.schedule_id != id);
        Ok(true)
    }

    async fn find_log(&self, filter: &LogFilter) -> Result<Option<ReminderLog>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.logs.values().find(|log| filter.matches(log)).cloned())
    }

    async fn list_logs(&self, filter: &LogFilter) -> Result<Vec<ReminderLog>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state
            .logs
            .values()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn recent_logs(
        &self,
        filter: &LogFilter,
        limit: u32,
    ) -> Result<Vec<ReminderLog>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        let mut logs: Vec<ReminderLog> = state
            .logs
            .values()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        logs.sort_by(|a, b| (b.sent_at, b.id).cmp(&(a.sent_at, a.id)));
        logs.truncate(limit as usize);
        Ok(logs)
    }

    async fn insert_log(&self, entry: NewReminderLog) -> Result<ReminderLog, StoreError> {
        let mut state = self.state.write().expect("store lock poisoned");
        if !state.schedules.contains_key(&entry.key.schedule_id) {
            return Err(StoreError::ScheduleNotFound(entry.key.schedule_id));
        }
        if entry.status == ReminderStatus::Sent && state.has_other_sent(entry.key, None) {
            return Err(StoreError::DuplicateSent(entry.key));
        }
        state.next_log_id += 1;
        let log = ReminderLog {
            id: state.next_log_id,
            schedule_id: entry.key.schedule_id,
            planned_due_date: entry.key.planned_due_date,
            reminder_offset_days: entry.key.reminder_offset_days,
            status: entry.status,
            error_message: entry.error_message,
            sent_at: entry.sent_at,
            backfilled: entry.backfilled,
            retry_count: 0,
        };
        state.logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn update_log(&self, log: &ReminderLog) -> Result<(), StoreError> {
        let mut state = self.state.write().expect("store lock poisoned");
        if !state.logs.contains_key(&log.id) {
            return Err(StoreError::LogNotFound(log.id));
        }
        if log.status == ReminderStatus::Sent && state.has_other_sent(log.key(), Some(log.id)) {
            return Err(StoreError::DuplicateSent(log.key()));
        }
        if let Some(stored) = state.logs.get_mut(&log.id) {
            stored.status = log.status;
            stored.error_message = log.error_message.clone();
            stored.sent_at = log.sent_at;
            stored.retry_count = log.retry_count;
        }
        Ok(())
    }
}

//! SQLite-backed store via sqlx.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use duewatch_core::{
    join_email_list, join_offsets, parse_email_list, parse_offsets, LogFilter, NewReminderLog,
    NewSchedule, ReminderKey, ReminderLog, ReminderStatus, Schedule,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::error::StoreError;
use crate::traits::ReminderStore;

const SCHEDULE_COLUMNS: &str = "id, entity_name, report_name, description, anchor_due_date, \
     interval_months, recipient_emails, cc_emails, reminder_offsets_days, active, \
     created_at, updated_at";

const LOG_COLUMNS: &str = "id, schedule_id, planned_due_date, reminder_offset_days, status, \
     error_message, sent_at, backfilled, retry_count";

// ── Row types ────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    id: i64,
    entity_name: String,
    report_name: String,
    description: Option<String>,
    anchor_due_date: NaiveDate,
    interval_months: i64,
    recipient_emails: String,
    cc_emails: Option<String>,
    reminder_offsets_days: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let interval_months = u32::try_from(row.interval_months).map_err(|_| {
            StoreError::Corrupt(format!(
                "schedule {} has interval_months {}",
                row.id, row.interval_months
            ))
        })?;
        Ok(Schedule {
            id: row.id,
            entity_name: row.entity_name,
            report_name: row.report_name,
            description: row.description,
            anchor_due_date: row.anchor_due_date,
            interval_months,
            recipient_emails: parse_email_list(&row.recipient_emails),
            cc_emails: row.cc_emails.as_deref().map(parse_email_list).unwrap_or_default(),
            reminder_offsets_days: row.reminder_offsets_days.as_deref().and_then(parse_offsets),
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: i64,
    schedule_id: i64,
    planned_due_date: NaiveDate,
    reminder_offset_days: i64,
    status: String,
    error_message: Option<String>,
    sent_at: DateTime<Utc>,
    backfilled: bool,
    retry_count: i64,
}

impl TryFrom<LogRow> for ReminderLog {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| StoreError::Corrupt(format!("reminder log {}: {}", row.id, what));
        Ok(ReminderLog {
            id: row.id,
            schedule_id: row.schedule_id,
            planned_due_date: row.planned_due_date,
            reminder_offset_days: u32::try_from(row.reminder_offset_days)
                .map_err(|_| corrupt("negative offset"))?,
            status: ReminderStatus::from_str(&row.status).map_err(|e| corrupt(&e.to_string()))?,
            error_message: row.error_message,
            sent_at: row.sent_at,
            backfilled: row.backfilled,
            retry_count: u32::try_from(row.retry_count)
                .map_err(|_| corrupt("negative retry count"))?,
        })
    }
}

fn optional_text(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Map constraint violations on a log write to the store's own errors.
fn map_write_error(err: sqlx::Error, key: ReminderKey) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateSent(key),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::ScheduleNotFound(key.schedule_id)
        }
        _ => StoreError::Database(err),
    }
}

fn push_log_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &LogFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = filter.schedule_id {
        qb.push(" AND schedule_id = ").push_bind(id);
    }
    if let Some(due) = filter.planned_due_date {
        qb.push(" AND planned_due_date = ").push_bind(due);
    }
    if let Some(offset) = filter.reminder_offset_days {
        qb.push(" AND reminder_offset_days = ").push_bind(i64::from(offset));
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(since) = filter.sent_since {
        qb.push(" AND sent_at >= ").push_bind(since);
    }
}

// ── Store ────────────────────────────────────────────────────────

/// Schedules and reminder logs in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply migrations.
    ///
    /// `sqlite::memory:` URLs get a single long-lived connection so the
    /// database survives for the lifetime of the store.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!(url, "SQLite store ready, migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ReminderStore for SqliteStore {
    async fn create_schedule(&self, draft: NewSchedule) -> Result<Schedule, StoreError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO schedules (entity_name, report_name, description, anchor_due_date, \
             interval_months, recipient_emails, cc_emails, reminder_offsets_days, active, \
             created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {SCHEDULE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(&draft.entity_name)
            .bind(&draft.report_name)
            .bind(&draft.description)
            .bind(draft.anchor_due_date)
            .bind(i64::from(draft.interval_months))
            .bind(join_email_list(&draft.recipient_emails))
            .bind(optional_text(join_email_list(&draft.cc_emails)))
            .bind(draft.reminder_offsets_days.as_deref().map(join_offsets))
            .bind(draft.active)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_schedule(&self, id: i64) -> Result<Option<Schedule>, StoreError> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?");
        sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Schedule::try_from)
            .transpose()
    }

    async fn list_schedules(&self, active: Option<bool>) -> Result<Vec<Schedule>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {SCHEDULE_COLUMNS} FROM schedules"));
        if let Some(active) = active {
            qb.push(" WHERE active = ").push_bind(active);
        }
        qb.push(" ORDER BY entity_name, report_name, id");
        qb.build_query_as::<ScheduleRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Schedule::try_from)
            .collect()
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<Schedule, StoreError> {
        let sql = format!(
            "UPDATE schedules SET entity_name = ?, report_name = ?, description = ?, \
             anchor_due_date = ?, interval_months = ?, recipient_emails = ?, cc_emails = ?, \
             reminder_offsets_days = ?, active = ?, updated_at = ? \
             WHERE id = ? RETURNING {SCHEDULE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(&schedule.entity_name)
            .bind(&schedule.report_name)
            .bind(&schedule.description)
            .bind(schedule.anchor_due_date)
            .bind(i64::from(schedule.interval_months))
            .bind(join_email_list(&schedule.recipient_emails))
            .bind(optional_text(join_email_list(&schedule.cc_emails)))
            .bind(schedule.reminder_offsets_days.as_deref().map(join_offsets))
            .bind(schedule.active)
            .bind(Utc::now())
            .bind(schedule.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::ScheduleNotFound(schedule.id))?;
        row.try_into()
    }

    async fn delete_schedule(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_log(&self, filter: &LogFilter) -> Result<Option<ReminderLog>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {LOG_COLUMNS} FROM reminder_logs"));
        push_log_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT 1");
        qb.build_query_as::<LogRow>()
            .fetch_optional(&self.pool)
            .await?
            .map(ReminderLog::try_from)
            .transpose()
    }

    async fn list_logs(&self, filter: &LogFilter) -> Result<Vec<ReminderLog>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {LOG_COLUMNS} FROM reminder_logs"));
        push_log_filter(&mut qb, filter);
        qb.push(" ORDER BY id");
        qb.build_query_as::<LogRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ReminderLog::try_from)
            .collect()
    }

    async fn recent_logs(
        &self,
        filter: &LogFilter,
        limit: u32,
    ) -> Result<Vec<ReminderLog>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {LOG_COLUMNS} FROM reminder_logs"));
        push_log_filter(&mut qb, filter);
        qb.push(" ORDER BY sent_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit));
        qb.build_query_as::<LogRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ReminderLog::try_from)
            .collect()
    }

    async fn insert_log(&self, entry: NewReminderLog) -> Result<ReminderLog, StoreError> {
        let sql = format!(
            "INSERT INTO reminder_logs (schedule_id, planned_due_date, reminder_offset_days, \
             status, error_message, sent_at, backfilled, retry_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0) RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LogRow>(&sql)
            .bind(entry.key.schedule_id)
            .bind(entry.key.planned_due_date)
            .bind(i64::from(entry.key.reminder_offset_days))
            .bind(entry.status.as_str())
            .bind(&entry.error_message)
            .bind(entry.sent_at)
            .bind(entry.backfilled)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, entry.key))?;
        row.try_into()
    }

    async fn update_log(&self, log: &ReminderLog) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE reminder_logs SET status = ?, error_message = ?, sent_at = ?, \
             retry_count = ? WHERE id = ?",
        )
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.sent_at)
        .bind(i64::from(log.retry_count))
        .bind(log.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, log.key()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LogNotFound(log.id));
        }
        Ok(())
    }
}

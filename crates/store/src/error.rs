use duewatch_core::ReminderKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Reminder already recorded as SENT ({0})")]
    DuplicateSent(ReminderKey),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(i64),

    #[error("Reminder log not found: {0}")]
    LogNotFound(i64),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

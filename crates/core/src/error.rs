use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuewatchError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Unknown reminder status: {0}")]
    UnknownStatus(String),
}

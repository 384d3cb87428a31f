//! Persistence for schedules and the reminder delivery log.
//!
//! `ReminderStore` is the seam the dispatch engine works against. Two
//! implementations are provided: `SqliteStore` (sqlx, with embedded
//! migrations) for real deployments and `MemoryStore` for tests and
//! throwaway runs. Both reject a second `SENT` row for the same
//! (schedule, due date, offset).

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ReminderStore;

pub mod config;
pub mod error;
pub mod reminder_log;
pub mod schedule;

pub use config::{load_dotenv, Config, MailConfig, ReminderConfig};
pub use error::*;
pub use reminder_log::*;
pub use schedule::*;

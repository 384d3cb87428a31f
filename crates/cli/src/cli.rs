use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use duewatch_core::{parse_date, ReminderStatus};

/// Compliance deadline reminders.
///
/// Tracks recurring reporting obligations and emails reminders at
/// configured day-offsets before each due date.
#[derive(Parser, Debug)]
#[command(name = "duewatch", version, about = "Compliance deadline reminders")]
pub struct CliArgs {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Print listings as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daily driver until Ctrl-C
    Run,

    /// Send every reminder owed today, then retry failures
    Scan,

    /// Backfill reminders missed inside a lookback window
    ScanMissed {
        /// Lookback in days (default: MISSED_SCAN_DAYS)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Send the due-day reminder for schedules due today
    SendToday,

    /// Retry failed deliveries whose backoff has elapsed
    Retry,

    /// Active schedules with their next due date
    Upcoming,

    /// Recent delivery log entries
    Logs {
        #[arg(long, default_value_t = 50)]
        limit: u32,

        /// Only SENT or FAILED rows
        #[arg(long)]
        status: Option<ReminderStatus>,

        #[arg(long)]
        schedule: Option<i64>,
    },

    /// Manage schedules
    #[command(alias = "s")]
    Schedule(ScheduleArgs),

    /// Insert the demo schedules
    SeedDemo,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// List schedules
    #[command(alias = "ls")]
    List {
        /// Only active schedules
        #[arg(long)]
        active: bool,
    },

    /// Create a schedule
    Add(ScheduleFields),

    /// Change fields of a schedule
    Edit {
        id: i64,

        #[command(flatten)]
        fields: ScheduleEdit,
    },

    /// Delete a schedule and its log
    #[command(alias = "rm")]
    Delete { id: i64 },

    Activate { id: i64 },

    Deactivate { id: i64 },
}

#[derive(Args, Debug)]
pub struct ScheduleFields {
    #[arg(long)]
    pub entity: String,

    #[arg(long)]
    pub report: String,

    #[arg(long)]
    pub description: Option<String>,

    /// A known due date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub anchor: NaiveDate,

    /// Months between due dates; 0 for a one-off
    #[arg(long, default_value_t = 0)]
    pub interval: u32,

    /// Comma-separated recipient addresses
    #[arg(long, default_value = "")]
    pub to: String,

    /// Comma-separated CC addresses
    #[arg(long, default_value = "")]
    pub cc: String,

    /// Comma-separated day offsets, e.g. "7,3,1,0" (default list when empty)
    #[arg(long, default_value = "")]
    pub offsets: String,

    /// Create the schedule inactive
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args, Debug)]
pub struct ScheduleEdit {
    #[arg(long)]
    pub entity: Option<String>,

    #[arg(long)]
    pub report: Option<String>,

    /// New description; an empty string clears it
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub anchor: Option<NaiveDate>,

    #[arg(long)]
    pub interval: Option<u32>,

    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub cc: Option<String>,

    /// New offsets; an empty string reverts to the default list
    #[arg(long)]
    pub offsets: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_schedule_add() {
        let args = CliArgs::parse_from([
            "duewatch",
            "schedule",
            "add",
            "--entity",
            "Bank Contoh A",
            "--report",
            "LBU Bulanan",
            "--anchor",
            "2025-09-30",
            "--interval",
            "1",
            "--offsets",
            "7,3,1,0",
        ]);
        let Command::Schedule(ScheduleArgs {
            command: ScheduleCommand::Add(fields),
        }) = args.command
        else {
            panic!("expected schedule add");
        };
        assert_eq!(fields.anchor, NaiveDate::from_ymd_opt(2025, 9, 30).unwrap());
        assert_eq!(fields.interval, 1);
        assert!(!fields.inactive);
    }

    #[test]
    fn rejects_bad_anchor() {
        let result = CliArgs::try_parse_from([
            "duewatch", "schedule", "add", "--entity", "A", "--report", "R", "--anchor",
            "30/09/2025",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_log_status_case_insensitively() {
        let args = CliArgs::parse_from(["duewatch", "logs", "--status", "failed", "--limit", "5"]);
        match args.command {
            Command::Logs { limit, status, .. } => {
                assert_eq!(limit, 5);
                assert_eq!(status, Some(ReminderStatus::Failed));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

//! Plain-text and JSON rendering of listings.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use duewatch_core::{join_email_list, join_offsets, ReminderLog, Schedule};
use duewatch_recurrence::offset_label;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One row of the `upcoming` listing.
#[derive(Debug, Serialize)]
pub struct UpcomingRow {
    pub schedule_id: i64,
    pub entity_name: String,
    pub report_name: String,
    pub next_due_date: Option<NaiveDate>,
    pub days_left: Option<i64>,
    pub offsets: Vec<u32>,
}

pub fn print_upcoming(rows: &[UpcomingRow]) {
    if rows.is_empty() {
        println!("No active schedules.");
        return;
    }
    println!(
        "{:>4}  {:<24} {:<24} {:<10} {:>5}  OFFSETS",
        "ID", "ENTITY", "REPORT", "NEXT DUE", "DAYS"
    );
    for row in rows {
        let (due, days) = match (row.next_due_date, row.days_left) {
            (Some(due), Some(days)) => (due.to_string(), days.to_string()),
            _ => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:>4}  {:<24} {:<24} {:<10} {:>5}  {}",
            row.schedule_id,
            truncate(&row.entity_name, 24),
            truncate(&row.report_name, 24),
            due,
            days,
            join_offsets(&row.offsets)
        );
    }
}

pub fn print_schedules(schedules: &[Schedule]) {
    if schedules.is_empty() {
        println!("No schedules.");
        return;
    }
    for s in schedules {
        let every = if s.is_recurring() {
            format!("every {} month(s)", s.interval_months)
        } else {
            "one-off".to_string()
        };
        let offsets = s
            .reminder_offsets_days
            .as_deref()
            .map(join_offsets)
            .unwrap_or_else(|| "default".to_string());
        println!(
            "#{} {} / {}{}",
            s.id,
            s.entity_name,
            s.report_name,
            if s.active { "" } else { " (inactive)" }
        );
        println!("    anchor {} {every}, offsets {offsets}", s.anchor_due_date);
        println!("    to: {}", join_email_list(&s.recipient_emails));
        if !s.cc_emails.is_empty() {
            println!("    cc: {}", join_email_list(&s.cc_emails));
        }
        if let Some(description) = &s.description {
            println!("    {description}");
        }
    }
}

pub fn print_logs(logs: &[ReminderLog], tz: Tz) {
    if logs.is_empty() {
        println!("No log entries.");
        return;
    }
    println!(
        "{:>5} {:>5}  {:<10} {:<7} {:<6}  {:<16} {:>5}  NOTE",
        "ID", "SCHED", "DUE", "LABEL", "STATUS", "ATTEMPT", "TRIES"
    );
    for log in logs {
        let mut note = String::new();
        if log.backfilled {
            note.push_str("backfilled ");
        }
        if let Some(error) = &log.error_message {
            note.push_str(error);
        }
        println!(
            "{:>5} {:>5}  {:<10} {:<7} {:<6}  {:<16} {:>5}  {}",
            log.id,
            log.schedule_id,
            log.planned_due_date,
            offset_label(i64::from(log.reminder_offset_days)),
            log.status,
            local_time(log.sent_at, tz),
            log.retry_count,
            note.trim_end()
        );
    }
}

fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("LBU", 24), "LBU");
        assert_eq!(truncate("abcdef", 4), "abc~");
    }

    #[test]
    fn log_times_render_in_app_timezone() {
        let at = Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap();
        assert_eq!(local_time(at, chrono_tz::Asia::Jakarta), "2025-03-08 08:00");
    }
}

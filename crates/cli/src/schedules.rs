//! Schedule management and demo data.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use duewatch_core::{parse_email_list, parse_offsets, NewSchedule, Schedule};
use duewatch_store::ReminderStore;
use tracing::info;

use crate::cli::{ScheduleCommand, ScheduleEdit, ScheduleFields};
use crate::output;

impl ScheduleFields {
    fn into_draft(self) -> NewSchedule {
        NewSchedule {
            entity_name: self.entity,
            report_name: self.report,
            description: self.description,
            anchor_due_date: self.anchor,
            interval_months: self.interval,
            recipient_emails: parse_email_list(&self.to),
            cc_emails: parse_email_list(&self.cc),
            reminder_offsets_days: parse_offsets(&self.offsets),
            active: !self.inactive,
        }
    }
}

impl ScheduleEdit {
    /// Overlay the given fields on `schedule`'s current values.
    fn apply_to(self, schedule: &Schedule) -> NewSchedule {
        NewSchedule {
            entity_name: self.entity.unwrap_or_else(|| schedule.entity_name.clone()),
            report_name: self.report.unwrap_or_else(|| schedule.report_name.clone()),
            description: match self.description {
                Some(text) => Some(text),
                None => schedule.description.clone(),
            },
            anchor_due_date: self.anchor.unwrap_or(schedule.anchor_due_date),
            interval_months: self.interval.unwrap_or(schedule.interval_months),
            recipient_emails: self
                .to
                .map(|to| parse_email_list(&to))
                .unwrap_or_else(|| schedule.recipient_emails.clone()),
            cc_emails: self
                .cc
                .map(|cc| parse_email_list(&cc))
                .unwrap_or_else(|| schedule.cc_emails.clone()),
            reminder_offsets_days: match self.offsets {
                Some(text) => parse_offsets(&text),
                None => schedule.reminder_offsets_days.clone(),
            },
            active: schedule.active,
        }
    }
}

async fn require(store: &dyn ReminderStore, id: i64) -> Result<Schedule> {
    match store.get_schedule(id).await? {
        Some(schedule) => Ok(schedule),
        None => bail!("schedule {id} not found"),
    }
}

pub async fn run(store: &dyn ReminderStore, command: ScheduleCommand, json: bool) -> Result<()> {
    match command {
        ScheduleCommand::List { active } => {
            let filter = active.then_some(true);
            let schedules = store.list_schedules(filter).await?;
            if json {
                output::print_json(&schedules)?;
            } else {
                output::print_schedules(&schedules);
            }
        }
        ScheduleCommand::Add(fields) => {
            let draft = fields.into_draft().normalized()?;
            let schedule = store
                .create_schedule(draft)
                .await
                .context("failed to create schedule")?;
            info!(schedule_id = schedule.id, "schedule created");
            println!("Created schedule #{}", schedule.id);
        }
        ScheduleCommand::Edit { id, fields } => {
            let mut schedule = require(store, id).await?;
            let draft = fields.apply_to(&schedule).normalized()?;
            schedule.apply(draft);
            store.update_schedule(&schedule).await?;
            println!("Updated schedule #{id}");
        }
        ScheduleCommand::Delete { id } => {
            if !store.delete_schedule(id).await? {
                bail!("schedule {id} not found");
            }
            println!("Deleted schedule #{id}");
        }
        ScheduleCommand::Activate { id } => set_active(store, id, true).await?,
        ScheduleCommand::Deactivate { id } => set_active(store, id, false).await?,
    }
    Ok(())
}

async fn set_active(store: &dyn ReminderStore, id: i64, active: bool) -> Result<()> {
    let mut schedule = require(store, id).await?;
    schedule.active = active;
    store.update_schedule(&schedule).await?;
    println!(
        "Schedule #{id} {}",
        if active { "activated" } else { "deactivated" }
    );
    Ok(())
}

fn demo_schedules() -> Vec<NewSchedule> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    vec![
        NewSchedule {
            entity_name: "Bank Contoh A".to_string(),
            report_name: "LBU Bulanan".to_string(),
            description: Some("Laporan Bulanan Bank Umum sesuai ketentuan.".to_string()),
            anchor_due_date: date(2025, 9, 30),
            interval_months: 1,
            recipient_emails: parse_email_list("picA@bank.co.id, compliance@bank.co.id"),
            cc_emails: parse_email_list("pengawas@ojk.go.id"),
            reminder_offsets_days: parse_offsets("7,3,1,0"),
            active: true,
        },
        NewSchedule {
            entity_name: "Bank Contoh B".to_string(),
            report_name: "APU PPT Triwulanan".to_string(),
            description: Some("Laporan penerapan APU dan PPT triwulanan.".to_string()),
            anchor_due_date: date(2025, 10, 15),
            interval_months: 3,
            recipient_emails: parse_email_list("picB@bank.co.id"),
            cc_emails: Vec::new(),
            reminder_offsets_days: None,
            active: true,
        },
        NewSchedule {
            entity_name: "P2P Contoh C".to_string(),
            report_name: "RBB Tahunan".to_string(),
            description: Some("Rencana Bisnis Tahunan entitas P2P.".to_string()),
            anchor_due_date: date(2025, 12, 31),
            interval_months: 12,
            recipient_emails: parse_email_list("ops@p2p.co.id"),
            cc_emails: parse_email_list("supervisor@ojk.go.id"),
            reminder_offsets_days: parse_offsets("30,14,7,3,1,0"),
            active: true,
        },
    ]
}

/// Insert the demo schedules that are not present yet (matched by entity
/// and report name). Returns how many were inserted.
pub async fn seed_demo(store: &dyn ReminderStore) -> Result<usize> {
    let existing = store.list_schedules(None).await?;
    let mut inserted = 0;
    for draft in demo_schedules() {
        let present = existing
            .iter()
            .any(|s| s.entity_name == draft.entity_name && s.report_name == draft.report_name);
        if present {
            continue;
        }
        store.create_schedule(draft).await?;
        inserted += 1;
    }
    Ok(inserted)
}

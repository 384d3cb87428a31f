//! The reminder dispatch engine.
//!
//! Three entry points walk every active schedule:
//!
//! - [`ReminderEngine::scan_and_send_at`]: the daily scan. Sends every
//!   reminder owed today, then runs the retry pass.
//! - [`ReminderEngine::scan_missed_at`]: backfill of reminders whose send
//!   day fell inside a lookback window but were never delivered.
//! - [`ReminderEngine::send_today_due_at`]: the due-day reminder only, for
//!   schedules with an occurrence today.
//!
//! Each has a wrapper without the `_at` suffix that uses the wall clock.
//! Every delivery attempt is logged immediately after the transport returns,
//! one row per attempt, so an interrupted pass never loses completed work.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use duewatch_core::{LogFilter, NewReminderLog, ReminderConfig, ReminderKey, Schedule};
use duewatch_notify::{Dispatcher, NotifyError, ReminderComposer};
use duewatch_recurrence::{
    generate_occurrences, matching_offsets, max_offset, next_occurrence, previous_occurrence,
    send_day, DEFAULT_MAX_OCCURRENCES,
};
use duewatch_store::{ReminderStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::retry::RetryReport;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Invalid daily schedule: {0}")]
    InvalidCron(String),
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    Sent,
    Failed,
    /// The transport was called but the store already held a `SENT` row for
    /// the reminder, so no row was written.
    Duplicate,
}

/// Counters for one engine pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub schedules_scanned: usize,
    pub sent: usize,
    pub failed: usize,
    /// Matches skipped because a `SENT` row already covered them.
    pub already_logged: usize,
    pub duplicates_rejected: usize,
    /// Schedules whose processing stopped on an error.
    pub schedule_errors: usize,
    /// Retry pass that followed a daily scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryReport>,
}

impl ScanReport {
    pub(crate) fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Sent => self.sent += 1,
            AttemptOutcome::Failed => self.failed += 1,
            AttemptOutcome::Duplicate => self.duplicates_rejected += 1,
        }
    }

    pub fn attempts(&self) -> usize {
        self.sent + self.failed + self.duplicates_rejected
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schedules={} sent={} failed={} already_logged={} duplicates={} errors={}",
            self.schedules_scanned,
            self.sent,
            self.failed,
            self.already_logged,
            self.duplicates_rejected,
            self.schedule_errors
        )?;
        if let Some(retry) = &self.retry {
            write!(f, " | retry: {retry}")?;
        }
        Ok(())
    }
}

/// Stateless orchestration over a store, a mail dispatcher and a config.
pub struct ReminderEngine {
    pub(crate) store: Arc<dyn ReminderStore>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) composer: ReminderComposer,
    pub(crate) config: ReminderConfig,
}

impl ReminderEngine {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        dispatcher: Dispatcher,
        config: ReminderConfig,
    ) -> Result<Self, DispatchError> {
        Ok(Self {
            store,
            dispatcher,
            composer: ReminderComposer::new()?,
            config,
        })
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ReminderStore> {
        &self.store
    }

    // ── Daily scan ──────────────────────────────────────────────────

    pub async fn scan_and_send(&self) -> Result<ScanReport, DispatchError> {
        self.scan_and_send_at(Utc::now()).await
    }

    /// Send every reminder owed on `now`'s calendar day, then retry failures.
    pub async fn scan_and_send_at(&self, now: DateTime<Utc>) -> Result<ScanReport, DispatchError> {
        let today = self.config.today(now);
        let day_start = self.config.start_of_day(today);
        let schedules = self.store.list_schedules(Some(true)).await?;
        info!(%today, schedules = schedules.len(), "daily scan started");

        let mut report = ScanReport::default();
        for schedule in &schedules {
            report.schedules_scanned += 1;
            if let Err(e) = self
                .scan_schedule(schedule, today, day_start, now, &mut report)
                .await
            {
                report.schedule_errors += 1;
                warn!(schedule_id = schedule.id, error = %e, "daily scan failed for schedule");
            }
        }

        match self.retry_failed_at(now).await {
            Ok(retry) => report.retry = Some(retry),
            Err(e) => warn!(error = %e, "retry pass failed"),
        }

        info!(%today, %report, "daily scan finished");
        Ok(report)
    }

    async fn scan_schedule(
        &self,
        schedule: &Schedule,
        today: NaiveDate,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<(), DispatchError> {
        let offsets = schedule.effective_offsets(&self.config.default_offsets);
        for due in candidate_due_dates(schedule, today, offsets) {
            for offset in matching_offsets(due, today, offsets) {
                let key = reminder_key(schedule, due, offset);
                let sent_today = LogFilter::sent_for(key).since(day_start);
                if self.store.find_log(&sent_today).await?.is_some() {
                    debug!(%key, "already sent today");
                    report.already_logged += 1;
                    continue;
                }
                let outcome = self.attempt(schedule, key, now, false).await?;
                report.record(outcome);
            }
        }
        Ok(())
    }

    // ── Missed-window backfill ──────────────────────────────────────

    pub async fn scan_missed(&self, days: Option<u32>) -> Result<ScanReport, DispatchError> {
        self.scan_missed_at(Utc::now(), days).await
    }

    /// Send reminders whose send day fell in `[today - days, today]` and
    /// that were never logged as `SENT`. `days` defaults to
    /// `missed_scan_days`.
    pub async fn scan_missed_at(
        &self,
        now: DateTime<Utc>,
        days: Option<u32>,
    ) -> Result<ScanReport, DispatchError> {
        let today = self.config.today(now);
        let days = days.unwrap_or(self.config.missed_scan_days);
        let window_start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let schedules = self.store.list_schedules(Some(true)).await?;
        info!(%window_start, %today, schedules = schedules.len(), "missed-reminder scan started");

        let mut report = ScanReport::default();
        for schedule in &schedules {
            report.schedules_scanned += 1;
            if let Err(e) = self
                .backfill_schedule(schedule, window_start, today, now, &mut report)
                .await
            {
                report.schedule_errors += 1;
                warn!(schedule_id = schedule.id, error = %e, "backfill failed for schedule");
            }
        }

        info!(%report, "missed-reminder scan finished");
        Ok(report)
    }

    async fn backfill_schedule(
        &self,
        schedule: &Schedule,
        window_start: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<(), DispatchError> {
        let offsets = schedule.effective_offsets(&self.config.default_offsets);
        let horizon = horizon(today, offsets);
        let occurrences = generate_occurrences(
            schedule.anchor_due_date,
            schedule.interval_months,
            window_start,
            horizon,
            backfill_occurrence_cap(window_start, horizon),
        );

        for due in occurrences {
            for &offset in offsets {
                let in_window = send_day(due, offset)
                    .is_some_and(|day| day >= window_start && day <= today);
                if !in_window {
                    continue;
                }
                let key = reminder_key(schedule, due, offset);
                if self.store.find_log(&LogFilter::sent_for(key)).await?.is_some() {
                    report.already_logged += 1;
                    continue;
                }
                info!(%key, "backfilling missed reminder");
                let outcome = self.attempt(schedule, key, now, true).await?;
                report.record(outcome);
            }
        }
        Ok(())
    }

    // ── Due-day send ────────────────────────────────────────────────

    pub async fn send_today_due(&self) -> Result<ScanReport, DispatchError> {
        self.send_today_due_at(Utc::now()).await
    }

    /// Send the due-day reminder for schedules with an occurrence today.
    pub async fn send_today_due_at(&self, now: DateTime<Utc>) -> Result<ScanReport, DispatchError> {
        let today = self.config.today(now);
        let day_start = self.config.start_of_day(today);
        let schedules = self.store.list_schedules(Some(true)).await?;

        let mut report = ScanReport::default();
        for schedule in &schedules {
            report.schedules_scanned += 1;
            let due = next_occurrence(schedule.anchor_due_date, schedule.interval_months, today);
            if due != Some(today) {
                continue;
            }
            let key = reminder_key(schedule, today, 0);
            match self.send_unless_sent_today(schedule, key, day_start, now).await {
                Ok(Some(outcome)) => report.record(outcome),
                Ok(None) => report.already_logged += 1,
                Err(e) => {
                    report.schedule_errors += 1;
                    warn!(schedule_id = schedule.id, error = %e, "due-day send failed for schedule");
                }
            }
        }

        info!(%today, %report, "due-day send finished");
        Ok(report)
    }

    async fn send_unless_sent_today(
        &self,
        schedule: &Schedule,
        key: ReminderKey,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptOutcome>, DispatchError> {
        let sent_today = LogFilter::sent_for(key).since(day_start);
        if self.store.find_log(&sent_today).await?.is_some() {
            return Ok(None);
        }
        self.attempt(schedule, key, now, false).await.map(Some)
    }

    // ── Shared attempt ──────────────────────────────────────────────

    /// Compose and deliver one reminder, then log the outcome.
    ///
    /// Composition and transport failures become `FAILED` rows. Only store
    /// errors other than a duplicate `SENT` are returned.
    pub(crate) async fn attempt(
        &self,
        schedule: &Schedule,
        key: ReminderKey,
        now: DateTime<Utc>,
        backfilled: bool,
    ) -> Result<AttemptOutcome, DispatchError> {
        let error = self.deliver(schedule, key).await;
        let entry = NewReminderLog::attempt(key, now, error, backfilled);
        let failed = entry.error_message.is_some();

        match self.store.insert_log(entry).await {
            Ok(log) if failed => {
                warn!(%key, log_id = log.id, error = ?log.error_message, "reminder failed");
                Ok(AttemptOutcome::Failed)
            }
            Ok(log) => {
                info!(%key, log_id = log.id, backfilled, "reminder sent");
                Ok(AttemptOutcome::Sent)
            }
            Err(StoreError::DuplicateSent(key)) => {
                warn!(%key, "reminder already recorded as sent by a concurrent pass");
                Ok(AttemptOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Compose and send; `Some(error)` on any failure.
    pub(crate) async fn deliver(&self, schedule: &Schedule, key: ReminderKey) -> Option<String> {
        match self
            .composer
            .compose(schedule, key.planned_due_date, key.reminder_offset_days)
        {
            Ok(email) => self.dispatcher.dispatch(&email).await.into_error(),
            Err(e) => Some(e.to_string()),
        }
    }
}

fn reminder_key(schedule: &Schedule, due: NaiveDate, offset: u32) -> ReminderKey {
    ReminderKey {
        schedule_id: schedule.id,
        planned_due_date: due,
        reminder_offset_days: offset,
    }
}

/// Last due date whose reminders can fire on or before `today`.
fn horizon(today: NaiveDate, offsets: &[u32]) -> NaiveDate {
    let ahead = max_offset(offsets).unwrap_or(0);
    today
        .checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or(NaiveDate::MAX)
}

/// Upper bound on occurrences between `start` and `end`.
///
/// Occurrences are at least a month (28 days) apart, so a long lookback
/// raises the cap above the default instead of truncating the newest ones.
fn backfill_occurrence_cap(start: NaiveDate, end: NaiveDate) -> usize {
    let span = usize::try_from((end - start).num_days()).unwrap_or(0);
    DEFAULT_MAX_OCCURRENCES.max(span / 28 + 2)
}

/// Due dates the daily scan checks against `today`: the next occurrence,
/// the one before it, and every occurrence within the largest offset.
pub fn candidate_due_dates(
    schedule: &Schedule,
    today: NaiveDate,
    offsets: &[u32],
) -> BTreeSet<NaiveDate> {
    let (anchor, interval) = (schedule.anchor_due_date, schedule.interval_months);
    let mut candidates: BTreeSet<NaiveDate> = generate_occurrences(
        anchor,
        interval,
        today,
        horizon(today, offsets),
        DEFAULT_MAX_OCCURRENCES,
    )
    .collect();
    candidates.extend(next_occurrence(anchor, interval, today));
    candidates.extend(previous_occurrence(anchor, interval, today));
    candidates
}

//! Time-triggered driver for the daily scan.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::engine::{DispatchError, ReminderEngine};

/// 6-field cron expression firing once a day at `hour:minute`.
pub fn daily_cron_expression(hour: u32, minute: u32) -> String {
    format!("0 {minute} {hour} * * *")
}

/// Runs a startup catch-up, then the daily scan at the configured local
/// time until `shutdown` is notified.
pub struct DailyDriver {
    engine: Arc<ReminderEngine>,
    schedule: Schedule,
    shutdown: Arc<Notify>,
}

impl DailyDriver {
    pub fn new(engine: Arc<ReminderEngine>, shutdown: Arc<Notify>) -> Result<Self, DispatchError> {
        let config = engine.config();
        let expression = daily_cron_expression(config.daily_job_hour, config.daily_job_minute);
        let schedule = Schedule::from_str(&expression)
            .map_err(|e| DispatchError::InvalidCron(format!("{expression}: {e}")))?;
        Ok(Self {
            engine,
            schedule,
            shutdown,
        })
    }

    /// First tick strictly after `now`, evaluated in the application timezone.
    pub fn next_tick(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let tz = self.engine.config().timezone;
        self.schedule
            .after(&now.with_timezone(&tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Daily scan plus missed-window backfill. Failures are only logged.
    pub async fn startup(&self) {
        match self.engine.scan_and_send().await {
            Ok(report) => info!(%report, "startup scan complete"),
            Err(e) => warn!(error = %e, "startup scan failed"),
        }
        match self.engine.scan_missed(None).await {
            Ok(report) => info!(%report, "startup backfill complete"),
            Err(e) => warn!(error = %e, "startup backfill failed"),
        }
    }

    pub async fn run(&self) {
        self.startup().await;

        loop {
            let now = Utc::now();
            let Some(next) = self.next_tick(now) else {
                warn!("daily schedule has no upcoming tick, driver stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next, "next daily scan scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.engine.scan_and_send().await {
                        Ok(report) => info!(%report, "scheduled scan complete"),
                        Err(e) => warn!(error = %e, "scheduled scan failed"),
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("daily driver shutting down");
                    break;
                }
            }
        }
    }
}

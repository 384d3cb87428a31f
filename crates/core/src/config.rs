use std::env;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::schedule::parse_offsets;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(v) => v.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}

pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
pub const DEFAULT_OFFSETS: [u32; 4] = [7, 3, 1, 0];

// ── Top-level config ──────────────────────────────────────────

/// Process-wide configuration, read once at startup and passed explicitly
/// into the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub reminders: ReminderConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", "sqlite://duewatch.db"),
            reminders: ReminderConfig::from_env(),
            mail: MailConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let r = &self.reminders;
        tracing::info!("Config loaded:");
        tracing::info!("  database:    url={}", self.database_url);
        tracing::info!(
            "  reminders:   tz={}, offsets={:?}, daily={:02}:{:02}",
            r.timezone,
            r.default_offsets,
            r.daily_job_hour,
            r.daily_job_minute
        );
        tracing::info!(
            "  backfill:    lookback={}d, retries={} (base {}m)",
            r.missed_scan_days,
            r.max_retry_attempts,
            r.retry_backoff_base_minutes
        );
        tracing::info!(
            "  mail:        dry_run={}, smtp={}:{}, sender={}",
            self.mail.dry_run,
            self.mail.smtp_host.as_deref().unwrap_or("(none)"),
            self.mail.smtp_port,
            self.mail.sender_email
        );
    }
}

// ── Reminders ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Application timezone used to decide what "today" is.
    pub timezone: Tz,
    /// Offsets used when a schedule carries none of its own.
    pub default_offsets: Vec<u32>,
    pub daily_job_hour: u32,
    pub daily_job_minute: u32,
    /// Lookback window of the missed-reminder scan.
    pub missed_scan_days: u32,
    pub max_retry_attempts: u32,
    pub retry_backoff_base_minutes: u32,
}

impl ReminderConfig {
    fn from_env() -> Self {
        let tz_name = env_or("APP_TZ", DEFAULT_TIMEZONE);
        let timezone = tz_name.trim().parse::<Tz>().unwrap_or_else(|e| {
            tracing::warn!(tz = %tz_name, error = %e, "unknown APP_TZ, falling back to UTC");
            chrono_tz::UTC
        });

        let default_offsets = env_opt("DEFAULT_REMINDER_OFFSETS")
            .and_then(|raw| parse_offsets(&raw))
            .unwrap_or_else(|| DEFAULT_OFFSETS.to_vec());

        Self {
            timezone,
            default_offsets,
            daily_job_hour: env_u32("DAILY_JOB_HOUR", 8).min(23),
            daily_job_minute: env_u32("DAILY_JOB_MINUTE", 0).min(59),
            missed_scan_days: env_u32("MISSED_SCAN_DAYS", 7),
            max_retry_attempts: env_u32("MAX_RETRY_ATTEMPTS", 3),
            retry_backoff_base_minutes: env_u32("RETRY_BACKOFF_BASE_MINUTES", 5),
        }
    }

    /// Calendar date of `now` in the application timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// First instant of `day` in the application timezone, as UTC.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Jakarta,
            default_offsets: DEFAULT_OFFSETS.to_vec(),
            daily_job_hour: 8,
            daily_job_minute: 0,
            missed_scan_days: 7,
            max_retry_attempts: 3,
            retry_backoff_base_minutes: 5,
        }
    }
}

// ── Mail ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// When set, nothing touches the network and every send succeeds.
    pub dry_run: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub use_tls: bool,
    pub sender_name: String,
    pub sender_email: String,
}

impl MailConfig {
    fn from_env() -> Self {
        Self {
            dry_run: env_bool("EMAIL_DRY_RUN", true),
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env_u16("SMTP_PORT", 587),
            smtp_username: env_opt("SMTP_USERNAME"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            use_tls: env_bool("SMTP_USE_TLS", true),
            sender_name: env_or("SENDER_NAME", "Reminder Bot"),
            sender_email: env_or("SENDER_EMAIL", ""),
        }
    }

    /// `"Name <address>"`, or the bare address when no name is set.
    pub fn sender_mailbox(&self) -> String {
        if self.sender_name.trim().is_empty() {
            self.sender_email.clone()
        } else {
            format!("{} <{}>", self.sender_name.trim(), self.sender_email.trim())
        }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && !self.sender_email.trim().is_empty()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            use_tls: true,
            sender_name: "Reminder Bot".to_string(),
            sender_email: String::new(),
        }
    }
}

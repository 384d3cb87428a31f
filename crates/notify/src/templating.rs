//! Minijinja rendering of reminder messages.
//!
//! Every reminder uses the same three built-in templates (subject, HTML body,
//! plain-text body). They are registered once per [`ReminderComposer`]; the
//! `.html` template is auto-escaped, so entity and report names cannot inject
//! markup.

use chrono::NaiveDate;
use duewatch_core::Schedule;
use duewatch_recurrence::offset_label;

use crate::traits::{NotifyError, OutgoingEmail};

const SUBJECT_TEMPLATE: &str = "subject.txt";
const HTML_TEMPLATE: &str = "reminder.html";
const TEXT_TEMPLATE: &str = "reminder.txt";

const SUBJECT_SOURCE: &str =
    "[Reminder {{ label }}] {{ report_name }} - {{ entity_name }} (Due {{ due_date_short }})";

const HTML_SOURCE: &str = r#"<p>Yth. PIC <b>{{ entity_name }}</b>,</p>
<p>Ini adalah pengingat <b>{{ label }}</b> untuk penyampaian laporan <b>{{ report_name }}</b>.</p>
<ul>
  <li><b>Entitas</b>: {{ entity_name }}</li>
  <li><b>Laporan</b>: {{ report_name }}</li>
  <li><b>Jatuh tempo</b>: {{ due_date_long }}</li>
</ul>
{% if description %}<p>{{ description }}</p>
{% endif %}<p>Mohon tindak lanjut sesuai ketentuan. Terima kasih.</p>
<hr>
<p><i>Pesan ini dikirim otomatis oleh sistem reminder.</i></p>
"#;

const TEXT_SOURCE: &str = "Reminder {{ label }} untuk {{ report_name }} - {{ entity_name }}
Jatuh tempo: {{ due_date_long }}
{% if description %}{{ description }}
{% endif %}Pesan ini dikirim otomatis oleh sistem reminder.
";

/// Values exposed to the reminder templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderContext {
    pub entity_name: String,
    pub report_name: String,
    pub description: Option<String>,
    /// e.g. `15 Mar 2025`.
    pub due_date_short: String,
    /// e.g. `Saturday, 15 March 2025`.
    pub due_date_long: String,
    /// `H-7`, `HARI H`, ...
    pub label: String,
}

impl ReminderContext {
    pub fn new(schedule: &Schedule, due: NaiveDate, offset_days: i64) -> Self {
        Self {
            entity_name: schedule.entity_name.clone(),
            report_name: schedule.report_name.clone(),
            description: schedule.description.clone(),
            due_date_short: due.format("%d %b %Y").to_string(),
            due_date_long: due.format("%A, %d %B %Y").to_string(),
            label: offset_label(offset_days),
        }
    }
}

/// Renders reminder emails from the built-in templates.
#[derive(Debug)]
pub struct ReminderComposer {
    env: minijinja::Environment<'static>,
}

impl ReminderComposer {
    /// Build a composer with the built-in templates registered.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if a built-in template fails to parse.
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = minijinja::Environment::new();
        for (name, source) in [
            (SUBJECT_TEMPLATE, SUBJECT_SOURCE),
            (HTML_TEMPLATE, HTML_SOURCE),
            (TEXT_TEMPLATE, TEXT_SOURCE),
        ] {
            env.add_template(name, source)
                .map_err(|e| NotifyError::Template(e.to_string()))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: &ReminderContext) -> Result<String, NotifyError> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Compose the reminder for `schedule`'s occurrence `due` at `offset_days`.
    pub fn compose(
        &self,
        schedule: &Schedule,
        due: NaiveDate,
        offset_days: u32,
    ) -> Result<OutgoingEmail, NotifyError> {
        let ctx = ReminderContext::new(schedule, due, i64::from(offset_days));
        Ok(OutgoingEmail {
            to: schedule.recipient_emails.clone(),
            cc: schedule.cc_emails.clone(),
            bcc: Vec::new(),
            subject: self.render(SUBJECT_TEMPLATE, &ctx)?,
            html_body: self.render(HTML_TEMPLATE, &ctx)?,
            text_body: self.render(TEXT_TEMPLATE, &ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn schedule() -> Schedule {
        let now = Utc::now();
        Schedule {
            id: 1,
            entity_name: "Bank Contoh A".to_string(),
            report_name: "LBU Bulanan".to_string(),
            description: Some("Laporan Bulanan Bank Umum.".to_string()),
            anchor_due_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            interval_months: 1,
            recipient_emails: vec!["pic@bank.co.id".to_string()],
            cc_emails: vec!["pengawas@ojk.go.id".to_string()],
            reminder_offsets_days: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    #[test]
    fn subject_carries_label_and_short_date() {
        let composer = ReminderComposer::new().unwrap();
        let email = composer.compose(&schedule(), due(), 7).unwrap();
        assert_eq!(
            email.subject,
            "[Reminder H-7] LBU Bulanan - Bank Contoh A (Due 15 Mar 2025)"
        );
    }

    #[test]
    fn due_day_subject() {
        let composer = ReminderComposer::new().unwrap();
        let email = composer.compose(&schedule(), due(), 0).unwrap();
        assert!(email.subject.starts_with("[Reminder HARI H]"), "got: {}", email.subject);
    }

    #[test]
    fn bodies_include_long_date_and_description() {
        let composer = ReminderComposer::new().unwrap();
        let email = composer.compose(&schedule(), due(), 3).unwrap();
        assert!(email.html_body.contains("Saturday, 15 March 2025"));
        assert!(email.html_body.contains("<p>Laporan Bulanan Bank Umum.</p>"));
        assert!(email.text_body.starts_with("Reminder H-3 untuk LBU Bulanan - Bank Contoh A"));
        assert!(email.text_body.contains("Jatuh tempo: Saturday, 15 March 2025"));
    }

    #[test]
    fn missing_description_renders_nothing() {
        let composer = ReminderComposer::new().unwrap();
        let mut s = schedule();
        s.description = None;
        let email = composer.compose(&s, due(), 1).unwrap();
        assert!(!email.html_body.contains("none"));
        assert!(!email.text_body.contains("none"));
    }

    #[test]
    fn html_body_is_escaped_subject_is_not() {
        let composer = ReminderComposer::new().unwrap();
        let mut s = schedule();
        s.entity_name = "A & B <Bank>".to_string();
        let email = composer.compose(&s, due(), 1).unwrap();
        assert!(email.html_body.contains("A &amp; B &lt;Bank&gt;"));
        assert!(email.subject.contains("A & B <Bank>"));
    }

    #[test]
    fn recipients_come_from_schedule() {
        let composer = ReminderComposer::new().unwrap();
        let email = composer.compose(&schedule(), due(), 1).unwrap();
        assert_eq!(email.to, vec!["pic@bank.co.id".to_string()]);
        assert_eq!(email.cc, vec!["pengawas@ojk.go.id".to_string()]);
        assert!(email.bcc.is_empty());
    }
}

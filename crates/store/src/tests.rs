#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use duewatch_core::{
        LogFilter, NewReminderLog, NewSchedule, ReminderKey, ReminderStatus,
    };

    use crate::{MemoryStore, ReminderStore, SqliteStore, StoreError};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(entity: &str, report: &str) -> NewSchedule {
        NewSchedule {
            entity_name: entity.to_string(),
            report_name: report.to_string(),
            description: Some("Laporan bulanan".to_string()),
            anchor_due_date: date(2025, 1, 15),
            interval_months: 1,
            recipient_emails: vec!["pic@bank.co.id".to_string(), "ops@bank.co.id".to_string()],
            cc_emails: vec!["audit@bank.co.id".to_string()],
            reminder_offsets_days: Some(vec![7, 3, 1, 0]),
            active: true,
        }
    }

    fn key(schedule_id: i64, offset: u32) -> ReminderKey {
        ReminderKey {
            schedule_id,
            planned_due_date: date(2025, 3, 15),
            reminder_offset_days: offset,
        }
    }

    async fn stores() -> Vec<(&'static str, Box<dyn ReminderStore>)> {
        vec![
            ("memory", Box::new(MemoryStore::new())),
            (
                "sqlite",
                Box::new(SqliteStore::connect("sqlite::memory:").await.unwrap()),
            ),
        ]
    }

    #[tokio::test]
    async fn schedule_roundtrip_preserves_fields() {
        for (name, store) in stores().await {
            let created = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            assert!(created.id > 0, "{name}");

            let fetched = store.get_schedule(created.id).await.unwrap().unwrap();
            assert_eq!(fetched.entity_name, "Bank A", "{name}");
            assert_eq!(fetched.anchor_due_date, date(2025, 1, 15), "{name}");
            assert_eq!(fetched.interval_months, 1, "{name}");
            assert_eq!(fetched.recipient_emails.len(), 2, "{name}");
            assert_eq!(fetched.cc_emails, vec!["audit@bank.co.id".to_string()], "{name}");
            assert_eq!(fetched.reminder_offsets_days, Some(vec![7, 3, 1, 0]), "{name}");
            assert!(fetched.active, "{name}");

            assert!(store.get_schedule(created.id + 100).await.unwrap().is_none(), "{name}");
        }
    }

    #[tokio::test]
    async fn schedule_without_offsets_or_cc() {
        for (name, store) in stores().await {
            let mut d = draft("Bank B", "APU PPT");
            d.cc_emails.clear();
            d.reminder_offsets_days = None;
            let created = store.create_schedule(d).await.unwrap();
            let fetched = store.get_schedule(created.id).await.unwrap().unwrap();
            assert!(fetched.cc_emails.is_empty(), "{name}");
            assert_eq!(fetched.reminder_offsets_days, None, "{name}");
        }
    }

    #[tokio::test]
    async fn list_orders_by_entity_and_filters_active() {
        for (name, store) in stores().await {
            store.create_schedule(draft("Bank B", "RBB")).await.unwrap();
            store.create_schedule(draft("Bank A", "Zeta")).await.unwrap();
            let mut inactive = draft("Bank A", "Alpha");
            inactive.active = false;
            store.create_schedule(inactive).await.unwrap();

            let all = store.list_schedules(None).await.unwrap();
            let names: Vec<_> = all
                .iter()
                .map(|s| format!("{}/{}", s.entity_name, s.report_name))
                .collect();
            assert_eq!(names, vec!["Bank A/Alpha", "Bank A/Zeta", "Bank B/RBB"], "{name}");

            let active = store.list_schedules(Some(true)).await.unwrap();
            assert_eq!(active.len(), 2, "{name}");
            assert!(active.iter().all(|s| s.active), "{name}");
        }
    }

    #[tokio::test]
    async fn update_schedule_persists_and_missing_errors() {
        for (name, store) in stores().await {
            let mut s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            s.interval_months = 3;
            s.active = false;
            s.reminder_offsets_days = Some(vec![14, 0]);
            let updated = store.update_schedule(&s).await.unwrap();
            assert_eq!(updated.interval_months, 3, "{name}");
            assert!(!updated.active, "{name}");
            assert!(updated.updated_at >= updated.created_at, "{name}");

            let fetched = store.get_schedule(s.id).await.unwrap().unwrap();
            assert_eq!(fetched.reminder_offsets_days, Some(vec![14, 0]), "{name}");

            s.id += 100;
            let err = store.update_schedule(&s).await.unwrap_err();
            assert!(matches!(err, StoreError::ScheduleNotFound(_)), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn delete_cascades_to_logs() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let at = Utc::now();
            store
                .insert_log(NewReminderLog::attempt(key(s.id, 7), at, None, false))
                .await
                .unwrap();

            assert!(store.delete_schedule(s.id).await.unwrap(), "{name}");
            assert!(!store.delete_schedule(s.id).await.unwrap(), "{name}");
            let logs = store.list_logs(&LogFilter::default()).await.unwrap();
            assert!(logs.is_empty(), "{name}");
        }
    }

    #[tokio::test]
    async fn second_sent_row_is_rejected() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let at = Utc::now();
            store
                .insert_log(NewReminderLog::attempt(key(s.id, 7), at, None, false))
                .await
                .unwrap();

            let err = store
                .insert_log(NewReminderLog::attempt(key(s.id, 7), at, None, true))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::DuplicateSent(k) if k == key(s.id, 7)), "{name}: {err}");

            // Another offset of the same occurrence is a different reminder.
            store
                .insert_log(NewReminderLog::attempt(key(s.id, 3), at, None, false))
                .await
                .unwrap();
            let sent = store
                .list_logs(&LogFilter::with_status(ReminderStatus::Sent))
                .await
                .unwrap();
            assert_eq!(sent.len(), 2, "{name}");
        }
    }

    #[tokio::test]
    async fn failed_rows_may_repeat() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let at = Utc::now();
            for _ in 0..2 {
                let log = store
                    .insert_log(NewReminderLog::attempt(
                        key(s.id, 1),
                        at,
                        Some("smtp down".to_string()),
                        false,
                    ))
                    .await
                    .unwrap();
                assert_eq!(log.status, ReminderStatus::Failed, "{name}");
                assert_eq!(log.retry_count, 0, "{name}");
                assert_eq!(log.error_message.as_deref(), Some("smtp down"), "{name}");
            }
            // A SENT row alongside FAILED ones is still allowed.
            store
                .insert_log(NewReminderLog::attempt(key(s.id, 1), at, None, false))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn update_log_records_retry() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let t0 = Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap();
            let mut log = store
                .insert_log(NewReminderLog::attempt(
                    key(s.id, 7),
                    t0,
                    Some("timeout".to_string()),
                    false,
                ))
                .await
                .unwrap();

            let t1 = t0 + Duration::minutes(5);
            log.record_retry(t1, None);
            store.update_log(&log).await.unwrap();

            let stored = store
                .find_log(&LogFilter::sent_for(key(s.id, 7)))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.id, log.id, "{name}");
            assert_eq!(stored.retry_count, 1, "{name}");
            assert_eq!(stored.sent_at, t1, "{name}");
            assert_eq!(stored.error_message, None, "{name}");
        }
    }

    #[tokio::test]
    async fn retry_to_sent_conflicts_with_existing_sent() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let at = Utc::now();
            let mut failed = store
                .insert_log(NewReminderLog::attempt(
                    key(s.id, 0),
                    at,
                    Some("boom".to_string()),
                    false,
                ))
                .await
                .unwrap();
            store
                .insert_log(NewReminderLog::attempt(key(s.id, 0), at, None, false))
                .await
                .unwrap();

            failed.record_retry(at, None);
            let err = store.update_log(&failed).await.unwrap_err();
            assert!(matches!(err, StoreError::DuplicateSent(_)), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn update_missing_log_errors() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let mut log = store
                .insert_log(NewReminderLog::attempt(key(s.id, 0), Utc::now(), None, false))
                .await
                .unwrap();
            log.id += 100;
            let err = store.update_log(&log).await.unwrap_err();
            assert!(matches!(err, StoreError::LogNotFound(_)), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn log_for_unknown_schedule_is_rejected() {
        for (name, store) in stores().await {
            let err = store
                .insert_log(NewReminderLog::attempt(key(999, 0), Utc::now(), None, false))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::ScheduleNotFound(999)), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn filters_and_recent_ordering() {
        for (name, store) in stores().await {
            let s = store.create_schedule(draft("Bank A", "LBU")).await.unwrap();
            let base = Utc.with_ymd_and_hms(2025, 3, 8, 1, 0, 0).unwrap();
            for (i, offset) in [7u32, 3, 1].into_iter().enumerate() {
                store
                    .insert_log(NewReminderLog::attempt(
                        key(s.id, offset),
                        base + Duration::days(i as i64),
                        None,
                        false,
                    ))
                    .await
                    .unwrap();
            }
            store
                .insert_log(NewReminderLog::attempt(
                    key(s.id, 0),
                    base + Duration::days(3),
                    Some("down".to_string()),
                    false,
                ))
                .await
                .unwrap();

            let since = store
                .list_logs(&LogFilter::default().since(base + Duration::days(1)))
                .await
                .unwrap();
            assert_eq!(since.len(), 3, "{name}");

            let failed = store
                .list_logs(&LogFilter::with_status(ReminderStatus::Failed))
                .await
                .unwrap();
            assert_eq!(failed.len(), 1, "{name}");
            assert_eq!(failed[0].reminder_offset_days, 0, "{name}");

            let recent = store.recent_logs(&LogFilter::default(), 2).await.unwrap();
            let offsets: Vec<u32> = recent.iter().map(|l| l.reminder_offset_days).collect();
            assert_eq!(offsets, vec![0, 1], "{name}");
        }
    }
}

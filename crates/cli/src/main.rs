mod cli;
mod output;
mod schedules;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::sync::Notify;
use tracing::info;

use duewatch_core::{load_dotenv, Config, LogFilter};
use duewatch_dispatch::{DailyDriver, ReminderEngine, ScanReport};
use duewatch_notify::{build_mailer, Dispatcher};
use duewatch_recurrence::next_occurrence;
use duewatch_store::{ReminderStore, SqliteStore};

use crate::cli::{CliArgs, Command};
use crate::output::UpcomingRow;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env();
    if let Some(url) = args.database_url.clone() {
        config.database_url = url;
    }

    let store: Arc<dyn ReminderStore> = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?,
    );

    match args.command {
        Command::Run => run_driver(&config, store).await?,
        Command::Scan => {
            let report = engine(&config, store)?.scan_and_send().await?;
            print_report("scan", &report, args.json)?;
        }
        Command::ScanMissed { days } => {
            let report = engine(&config, store)?.scan_missed(days).await?;
            print_report("scan-missed", &report, args.json)?;
        }
        Command::SendToday => {
            let report = engine(&config, store)?.send_today_due().await?;
            print_report("send-today", &report, args.json)?;
        }
        Command::Retry => {
            let report = engine(&config, store)?.retry_failed().await?;
            if args.json {
                output::print_json(&report)?;
            } else {
                println!("retry: {report}");
            }
        }
        Command::Upcoming => {
            let rows = upcoming(&config, store.as_ref()).await?;
            if args.json {
                output::print_json(&rows)?;
            } else {
                output::print_upcoming(&rows);
            }
        }
        Command::Logs {
            limit,
            status,
            schedule,
        } => {
            let filter = LogFilter {
                schedule_id: schedule,
                status,
                ..LogFilter::default()
            };
            let logs = store.recent_logs(&filter, limit).await?;
            if args.json {
                output::print_json(&logs)?;
            } else {
                output::print_logs(&logs, config.reminders.timezone);
            }
        }
        Command::Schedule(schedule_args) => {
            schedules::run(store.as_ref(), schedule_args.command, args.json).await?;
        }
        Command::SeedDemo => {
            let inserted = schedules::seed_demo(store.as_ref()).await?;
            println!("Seeded {inserted} demo schedule(s).");
        }
    }

    Ok(())
}

fn engine(config: &Config, store: Arc<dyn ReminderStore>) -> Result<ReminderEngine> {
    let mailer = build_mailer(&config.mail).context("failed to set up mail transport")?;
    let dispatcher = Dispatcher::new(mailer);
    info!(transport = dispatcher.transport_name(), "mail transport ready");
    ReminderEngine::new(store, dispatcher, config.reminders.clone())
        .context("failed to build reminder engine")
}

async fn run_driver(config: &Config, store: Arc<dyn ReminderStore>) -> Result<()> {
    config.log_summary();

    let engine = Arc::new(engine(config, store)?);
    let shutdown = Arc::new(Notify::new());
    let driver = DailyDriver::new(engine, shutdown.clone())?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            signal.notify_one();
        }
    });

    driver.run().await;
    info!("duewatch driver exited cleanly");
    Ok(())
}

async fn upcoming(config: &Config, store: &dyn ReminderStore) -> Result<Vec<UpcomingRow>> {
    let today = config.reminders.today(Utc::now());
    let mut rows: Vec<UpcomingRow> = store
        .list_schedules(Some(true))
        .await?
        .into_iter()
        .map(|s| {
            let next = next_occurrence(s.anchor_due_date, s.interval_months, today);
            UpcomingRow {
                schedule_id: s.id,
                offsets: s
                    .effective_offsets(&config.reminders.default_offsets)
                    .to_vec(),
                entity_name: s.entity_name,
                report_name: s.report_name,
                next_due_date: next,
                days_left: next.map(|due| (due - today).num_days()),
            }
        })
        .collect();
    // Soonest first; schedules with no upcoming date last.
    rows.sort_by_key(|row| (row.next_due_date.is_none(), row.next_due_date));
    Ok(rows)
}

fn print_report(pass: &str, report: &ScanReport, json: bool) -> Result<()> {
    if json {
        output::print_json(report)?;
    } else {
        println!("{pass}: {report}");
    }
    Ok(())
}

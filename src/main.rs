use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use reminder_bot::config::Config;
use reminder_bot::error::{ReminderBotError, Result};
use reminder_bot::jobs::delivery_job_from_config;
use reminder_bot::reminders::{parse_due_at, Reminder, ReminderStore};
use reminder_bot::runtime_paths::default_db_path;
use reminder_bot::services::reminders::{offset_from, ReminderService};
use reminder_bot::units::{humanize, parse_offset};

#[derive(Parser, Debug)]
#[command(name = "reminder-bot")]
#[command(about = "Manage reminders stored by Reminder Bot")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("REMINDER_BOT_GIT_SHA"), ")"))]
struct Cli {
    /// SQLite file; beats DATABASE_PATH and the config file
    #[arg(long, global = true)]
    db: Option<String>,

    #[arg(long, global = true, env = "REMINDER_BOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule a new reminder
    Add(AddArgs),
    /// Show a user's reminders, soonest first
    List {
        #[arg(long)]
        user: i64,
    },
    /// Remove one reminder owned by the user
    Delete {
        #[arg(long)]
        user: i64,
        id: i64,
    },
    /// Remove every reminder owned by the user
    Clear {
        #[arg(long)]
        user: i64,
    },
    /// Deliver everything that is due right now, once
    Scan,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    user: i64,

    /// Offset such as "10minutes" or "2 days"
    #[arg(long = "in", conflicts_with = "at")]
    in_: Option<String>,

    /// Absolute RFC 3339 time
    #[arg(long)]
    at: Option<String>,

    /// Repeat interval such as "1 week"
    #[arg(long)]
    every: Option<String>,

    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_db = default_db_path();
    let config = Config::load(cli.config.as_deref(), &default_db)?;
    let _log_guard = reminder_bot::logging::init_tracing("reminder_bot", &config.logging)?;
    let db_path = config.sqlite_path(cli.db.as_deref(), &default_db);
    let store = Arc::new(ReminderStore::new(db_path).await?);
    let service = ReminderService::new(store.clone());

    match cli.command {
        Command::Add(args) => {
            let due_at = match (args.in_.as_deref(), args.at.as_deref()) {
                (Some(token), None) => offset_from(Utc::now(), parse_offset(token)?)?,
                (None, Some(raw)) => parse_due_at(raw)?,
                _ => {
                    return Err(ReminderBotError::Validation(
                        "pass either --in or --at".to_string(),
                    ))
                }
            };
            let repeat = args.every.as_deref().map(parse_offset).transpose()?;
            let message = args.message.join(" ");
            let reminder = service
                .create_reminder_at(args.user, &message, due_at, repeat)
                .await?;
            println!("Created {}", describe(&reminder));
        }
        Command::List { user } => {
            let reminders = service.list_reminders(user).await?;
            if reminders.is_empty() {
                println!("No reminders for user {user}");
            }
            for reminder in reminders {
                println!("{}", describe(&reminder));
            }
        }
        Command::Delete { user, id } => {
            service.delete_reminder(user, id).await?;
            println!("Deleted reminder #{id}");
        }
        Command::Clear { user } => {
            let deleted = service.delete_all_reminders(user).await?;
            println!("Deleted {deleted} reminder(s) for user {user}");
        }
        Command::Scan => {
            let job = delivery_job_from_config(&config, store)?;
            let report = job.scan(Utc::now()).await?;
            println!(
                "due={} delivered={} rescheduled={} deleted={} failed={} persist_failed={}",
                report.due,
                report.delivered,
                report.rescheduled,
                report.deleted,
                report.failed,
                report.persist_failed
            );
        }
    }

    Ok(())
}

fn describe(reminder: &Reminder) -> String {
    let repeat = reminder
        .repeat_interval
        .map(|seconds| format!(" (every {})", humanize(seconds)))
        .unwrap_or_default();
    format!(
        "#{} {} {}{}",
        reminder.id,
        reminder.due_at.to_rfc3339(),
        reminder.message,
        repeat
    )
}

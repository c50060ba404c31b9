use std::path::PathBuf;

use clap::Parser;
use reminder_bot::config::Config;
use reminder_bot::daemon;
use reminder_bot::error::Result;
use reminder_bot::runtime_paths::default_db_path;

#[derive(Parser, Debug)]
#[command(name = "reminder-botd")]
#[command(about = "Reminder Bot delivery daemon")]
struct Cli {
    #[arg(long, env = "REMINDER_BOT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// SQLite file; beats DATABASE_PATH and the config file
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_db = default_db_path();
    let mut config = Config::load(cli.config.as_deref(), &default_db)?;
    let _log_guard = reminder_bot::logging::init_tracing("reminder_botd", &config.logging)?;
    if let Some(host) = cli.host {
        config.daemon.host = host;
    }
    if let Some(port) = cli.port {
        config.daemon.port = port;
    }
    let db_path = config.sqlite_path(cli.db.as_deref(), &default_db);

    daemon::run(config, &db_path).await
}

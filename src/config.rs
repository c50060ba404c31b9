use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ReminderBotError, Result};

pub const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_seconds: u64,
    pub store_timeout_seconds: u64,
    pub delivery_timeout_seconds: u64,
    /// Upper bound on reminders handled per scan; 0 means everything that is due.
    pub batch_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_seconds: 60,
            store_timeout_seconds: 10,
            delivery_timeout_seconds: 15,
            batch_limit: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds.max(1))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds.max(1))
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_seconds.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    Telegram {
        bot_token: Option<String>,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    },
    Log,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::Log
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DispatcherConfig {
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7979,
        }
    }
}

/// Console logging is always on; `file` adds a daily-rotated copy next to it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn convention_defaults(db_path: &str) -> Self {
        Self {
            database: DatabaseConfig {
                sqlite_path: Some(db_path.to_string()),
            },
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ReminderBotError::Config(format!("cannot read {}: {e}", path.to_string_lossy()))
        })?;
        serde_json::from_str(&raw).map_err(|e| ReminderBotError::Config(e.to_string()))
    }

    /// Reads `path` when given, else the config file under the app root if there is
    /// one, else conventions. The process environment is layered on top.
    pub fn load(path: Option<&Path>, default_db_path: &str) -> Result<Self> {
        Self::load_with(
            path,
            &crate::runtime_paths::default_config_path(),
            default_db_path,
            |key| std::env::var(key).ok(),
        )
    }

    pub fn load_with(
        path: Option<&Path>,
        default_config_path: &Path,
        default_db_path: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| default_config_path.is_file().then(|| default_config_path.to_path_buf()));
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::convention_defaults(default_db_path),
        };
        let config = config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.sqlite_path = Some(path);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(seconds) = lookup("REMINDER_POLL_SECONDS").and_then(|v| v.parse().ok()) {
            self.scheduler.poll_seconds = seconds;
        }
        if let Some(token) = lookup("BOT_TOKEN") {
            self.notifier = match self.notifier {
                NotifierConfig::Telegram {
                    base_url,
                    timeout_seconds,
                    ..
                } => NotifierConfig::Telegram {
                    bot_token: Some(token),
                    base_url,
                    timeout_seconds,
                },
                NotifierConfig::Log => NotifierConfig::Telegram {
                    bot_token: Some(token),
                    base_url: None,
                    timeout_seconds: None,
                },
            };
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.poll_seconds == 0 {
            return Err(ReminderBotError::Config(
                "scheduler.poll_seconds must be at least 1".to_string(),
            ));
        }
        if let NotifierConfig::Telegram { bot_token, .. } = &self.notifier {
            let missing = bot_token
                .as_deref()
                .map(|token| token.trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ReminderBotError::Config(
                    "telegram notifier needs notifier.bot_token or BOT_TOKEN".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// An explicit `--db` flag wins over `DATABASE_PATH` and the config file, which
    /// win over `fallback`.
    pub fn sqlite_path(&self, flag: Option<&str>, fallback: &str) -> String {
        let non_blank = |path: &&str| !path.is_empty();
        flag.map(str::trim)
            .filter(non_blank)
            .or_else(|| {
                self.database
                    .sqlite_path
                    .as_deref()
                    .map(str::trim)
                    .filter(non_blank)
            })
            .unwrap_or(fallback)
            .to_string()
    }
}

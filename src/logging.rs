use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ReminderBotError, Result};

const KEPT_LOG_FILES: usize = 5;

/// Installs the global subscriber. Keep the returned guard alive for as long as the
/// file sink should keep flushing.
pub fn init_tracing(component: &str, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let directives = filter_directives(component, |key| std::env::var(key).ok(), logging);
    let filter = EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(component)));

    let (file_layer, guard) = match logging.file.as_deref().map(str::trim) {
        Some(file) if !file.is_empty() => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(file)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    let console = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    Ok(guard)
}

/// `REMINDER_BOT_LOG` and `RUST_LOG` take full directives; `LOG_LEVEL` and
/// `logging.level` take a bare level.
fn filter_directives(
    component: &str,
    lookup: impl Fn(&str) -> Option<String>,
    logging: &LoggingConfig,
) -> String {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    lookup("REMINDER_BOT_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .or_else(|| lookup("LOG_LEVEL").and_then(|level| level_directive(&level)))
        .or_else(|| logging.level.as_deref().and_then(level_directive))
        .unwrap_or_else(|| default_directives(component))
}

fn default_directives(component: &str) -> String {
    format!("info,reminder_bot=debug,{component}=debug")
}

fn level_directive(level: &str) -> Option<String> {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => return None,
    };
    Some(level.to_string())
}

fn file_appender(file: &str) -> Result<RollingFileAppender> {
    let path = Path::new(file);
    let prefix = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| ReminderBotError::Config(format!("logging.file '{file}' has no file name")))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(KEPT_LOG_FILES)
        .build(dir)
        .map_err(|e| ReminderBotError::Config(format!("cannot open log file {file}: {e}")))
}

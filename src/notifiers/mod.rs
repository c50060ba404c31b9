use std::sync::Arc;
use std::time::Duration;

use crate::config::{NotifierConfig, DEFAULT_TELEGRAM_BASE_URL};
use crate::error::{ReminderBotError, Result};
use crate::interfaces::notifier::Notifier;

pub mod log;
pub mod telegram;

pub use log::LogNotifier;
pub use telegram::TelegramNotifier;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config {
        NotifierConfig::Log => Ok(Arc::new(LogNotifier)),
        NotifierConfig::Telegram {
            bot_token,
            base_url,
            timeout_seconds,
        } => {
            let token = bot_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| {
                    ReminderBotError::Config("telegram notifier is missing bot_token".to_string())
                })?;
            let base_url = base_url
                .as_deref()
                .unwrap_or(DEFAULT_TELEGRAM_BASE_URL);
            let timeout = Duration::from_secs(
                timeout_seconds
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS)
                    .max(1),
            );
            Ok(Arc::new(TelegramNotifier::new(base_url, token, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_configured_channel() {
        let log = build_notifier(&NotifierConfig::Log).unwrap();
        assert_eq!(log.name(), "log");

        let telegram = build_notifier(&NotifierConfig::Telegram {
            bot_token: Some("123:abc".to_string()),
            base_url: Some("http://127.0.0.1:1".to_string()),
            timeout_seconds: Some(2),
        })
        .unwrap();
        assert_eq!(telegram.name(), "telegram");
    }

    #[test]
    fn telegram_without_token_is_a_config_error() {
        let err = build_notifier(&NotifierConfig::Telegram {
            bot_token: Some(" ".to_string()),
            base_url: None,
            timeout_seconds: None,
        })
        .err()
        .expect("missing token");
        assert!(matches!(err, ReminderBotError::Config(_)));
    }
}

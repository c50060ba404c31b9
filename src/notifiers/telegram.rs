use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ReminderBotError, Result};
use crate::interfaces::notifier::Notifier;

/// Sends reminders as Telegram chat messages through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    send_message_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
    error_code: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(base_url: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReminderBotError::Http(e.to_string()))?;
        let base = base_url.trim().trim_end_matches('/');
        Ok(Self {
            client,
            send_message_url: format!("{base}/bot{}/sendMessage", bot_token.trim()),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, user_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.send_message_url)
            .json(&json!({ "chat_id": user_id, "text": text }))
            .send()
            .await
            // The URL embeds the bot token; keep it out of error strings.
            .map_err(|e| ReminderBotError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();
        match body {
            Some(body) if status.is_success() && body.ok => Ok(()),
            Some(body) => Err(ReminderBotError::Delivery(format!(
                "telegram rejected message ({}): {}",
                body.error_code.unwrap_or(i64::from(status.as_u16())),
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(ReminderBotError::Delivery(format!(
                "telegram answered {status} without a readable body"
            ))),
        }
    }
}

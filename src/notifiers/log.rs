use async_trait::async_trait;

use crate::error::Result;
use crate::interfaces::notifier::Notifier;

/// Writes reminders to the log instead of sending them anywhere.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, user_id: i64, text: &str) -> Result<()> {
        tracing::info!(user_id, text, "Reminder delivered to log channel");
        Ok(())
    }
}

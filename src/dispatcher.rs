use std::sync::Arc;
use std::time::Duration;

use crate::error::{ReminderBotError, Result};
use crate::interfaces::notifier::Notifier;
use crate::reminders::Reminder;

pub const DEFAULT_PREFIX: &str = "⏰ Reminder: ";
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Turns a due reminder into one notifier call and classifies the outcome.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    prefix: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            prefix: DEFAULT_PREFIX.to_string(),
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel(&self) -> &str {
        self.notifier.name()
    }

    pub fn render(&self, reminder: &Reminder) -> String {
        format!("{}{}", self.prefix, reminder.message)
    }

    /// Every failure, timeouts included, comes back as [`ReminderBotError::Delivery`].
    pub async fn send(&self, reminder: &Reminder) -> Result<()> {
        let text = self.render(reminder);
        match tokio::time::timeout(self.timeout, self.notifier.notify(reminder.user_id, &text))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(ReminderBotError::Delivery(reason))) => Err(ReminderBotError::Delivery(reason)),
            Ok(Err(other)) => Err(ReminderBotError::Delivery(other.to_string())),
            Err(_) => Err(ReminderBotError::Delivery(format!(
                "{} did not answer within {:?}",
                self.notifier.name(),
                self.timeout
            ))),
        }
    }
}

use async_trait::async_trait;

use crate::error::Result;

/// Outbound channel that puts a rendered text in front of a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, user_id: i64, text: &str) -> Result<()>;
}

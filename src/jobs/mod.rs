use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::notifiers::build_notifier;
use crate::reminders::ReminderStore;

mod reminder_delivery;

pub use reminder_delivery::{ReminderDeliveryJob, ScanReport};

/// Wires the configured notifier, dispatcher settings and timeouts into a delivery job.
pub fn delivery_job_from_config(
    config: &Config,
    store: Arc<ReminderStore>,
) -> Result<ReminderDeliveryJob> {
    let notifier = build_notifier(&config.notifier)?;
    let mut dispatcher =
        Dispatcher::new(notifier).with_timeout(config.scheduler.delivery_timeout());
    if let Some(prefix) = &config.dispatcher.prefix {
        dispatcher = dispatcher.with_prefix(prefix.clone());
    }
    Ok(ReminderDeliveryJob::new(
        store,
        Arc::new(dispatcher),
        config.scheduler.poll_interval(),
    )
    .with_store_timeout(config.scheduler.store_timeout())
    .with_batch_limit(config.scheduler.batch_limit))
}

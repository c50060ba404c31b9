pub mod config;
pub mod daemon;
pub mod dispatcher;
pub mod error;
pub mod interfaces;
pub mod jobs;
pub mod logging;
pub mod notifiers;
pub mod reminders;
pub mod runtime_paths;
pub mod scheduler;
pub mod services;
pub mod units;

pub type Result<T> = std::result::Result<T, error::ReminderBotError>;

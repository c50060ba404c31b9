pub mod notifier;
pub mod scheduler;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderBotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid unit: {0}")]
    InvalidUnit(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("delivery error: {0}")]
    Delivery(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ReminderBotError {
    /// Input errors are the caller's to fix; retrying them never helps.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidUnit(_) | Self::InvalidQuantity(_)
        )
    }
}

pub use crate::Result;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_detail() {
        let err = ReminderBotError::Validation("message must not be empty".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: message must not be empty"
        );
        let err = ReminderBotError::Store("database is locked".to_string());
        assert!(format!("{err}").starts_with("store error"));
    }

    #[test]
    fn client_errors_are_the_input_kinds() {
        assert!(ReminderBotError::InvalidUnit("fortnight".to_string()).is_client_error());
        assert!(ReminderBotError::InvalidQuantity("0".to_string()).is_client_error());
        assert!(!ReminderBotError::NotFound("reminder 1".to_string()).is_client_error());
        assert!(!ReminderBotError::Delivery("blocked".to_string()).is_client_error());
    }
}

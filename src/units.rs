//! Time unit vocabulary for reminder offsets and repeat intervals.
//!
//! Units are a closed set; singular and plural spellings are synonyms. A month is
//! 30 days and a year 365 days, no calendar arithmetic.

use std::fmt;
use std::str::FromStr;

use crate::error::{ReminderBotError, Result};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    pub fn seconds(self) -> i64 {
        match self {
            TimeUnit::Minute => MINUTE,
            TimeUnit::Hour => HOUR,
            TimeUnit::Day => DAY,
            TimeUnit::Week => 7 * DAY,
            TimeUnit::Month => 30 * DAY,
            TimeUnit::Year => 365 * DAY,
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

impl FromStr for TimeUnit {
    type Err = ReminderBotError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let token = value.trim().to_lowercase();
        Ok(match token.as_str() {
            "minute" | "minutes" => TimeUnit::Minute,
            "hour" | "hours" => TimeUnit::Hour,
            "day" | "days" => TimeUnit::Day,
            "week" | "weeks" => TimeUnit::Week,
            "month" | "months" => TimeUnit::Month,
            "year" | "years" => TimeUnit::Year,
            _ => return Err(ReminderBotError::InvalidUnit(value.trim().to_string())),
        })
    }
}

/// Converts `quantity` of `unit` into seconds.
pub fn resolve(quantity: i64, unit: &str) -> Result<i64> {
    let unit: TimeUnit = unit.parse()?;
    if quantity <= 0 {
        return Err(ReminderBotError::InvalidQuantity(format!(
            "{quantity} must be greater than zero"
        )));
    }
    quantity.checked_mul(unit.seconds()).ok_or_else(|| {
        ReminderBotError::InvalidQuantity(format!("{quantity} {unit}s is out of range"))
    })
}

/// Like [`resolve`], for a quantity that still needs parsing.
pub fn resolve_str(quantity: &str, unit: &str) -> Result<i64> {
    let trimmed = quantity.trim();
    let quantity = trimmed
        .parse::<i64>()
        .map_err(|_| ReminderBotError::InvalidQuantity(format!("'{trimmed}' is not a number")))?;
    resolve(quantity, unit)
}

/// Parses a single `<quantity><unit>` token such as `10minutes` or `2 days`.
pub fn parse_offset(token: &str) -> Result<i64> {
    let token = token.trim();
    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (quantity, unit) = token.split_at(split);
    if quantity.is_empty() {
        return Err(ReminderBotError::InvalidQuantity(format!(
            "'{token}' does not start with a number"
        )));
    }
    resolve_str(quantity, unit)
}

/// Renders seconds in the largest unit that divides them evenly, e.g. `2 days`.
/// Anything that is not a whole number of minutes is shown in seconds.
pub fn humanize(seconds: i64) -> String {
    let unit = TimeUnit::ALL
        .iter()
        .rev()
        .copied()
        .find(|unit| seconds != 0 && seconds % unit.seconds() == 0);
    match unit {
        Some(unit) => {
            let count = seconds / unit.seconds();
            let plural = if count.abs() == 1 { "" } else { "s" };
            format!("{count} {unit}{plural}")
        }
        None => format!("{seconds} seconds"),
    }
}

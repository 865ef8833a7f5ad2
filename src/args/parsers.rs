use std::time::Duration;

use super::types::PositiveUsize;
use crate::error::{AppError, AppResult, ValidationError};

const MILLIS_PER_SEC: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_HOUR: u64 = 3_600_000;

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration(s).map_err(AppError::from)
}

/// Parses `<digits>[ms|s|m|h]`; a bare number means seconds.
///
/// # Errors
///
/// Returns an error for empty, malformed, overflowing or zero durations.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, ValidationError> {
    let text = s.trim();
    if text.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let split = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    if digits.is_empty() {
        return Err(ValidationError::InvalidDurationFormat {
            value: text.to_owned(),
        });
    }
    let amount: u64 = digits
        .parse()
        .map_err(|source| ValidationError::InvalidDurationNumber {
            value: text.to_owned(),
            source,
        })?;

    let millis = amount
        .checked_mul(unit_millis(unit)?)
        .ok_or(ValidationError::DurationOverflow)?;
    if millis == 0 {
        return Err(ValidationError::DurationZero);
    }
    Ok(Duration::from_millis(millis))
}

const fn unit_millis_table(unit: &[u8]) -> Option<u64> {
    match unit {
        b"ms" => Some(1),
        b"" | b"s" => Some(MILLIS_PER_SEC),
        b"m" => Some(MILLIS_PER_MINUTE),
        b"h" => Some(MILLIS_PER_HOUR),
        _ => None,
    }
}

fn unit_millis(unit: &str) -> Result<u64, ValidationError> {
    unit_millis_table(unit.as_bytes()).ok_or_else(|| ValidationError::InvalidDurationUnit {
        unit: unit.to_owned(),
    })
}

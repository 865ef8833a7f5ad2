use std::time::Duration;

use crate::error::WorkerError;

/// Microseconds per millisecond.
const US_PER_MS: u128 = 1_000;
/// Microseconds per hundredth of a millisecond.
const US_PER_CENTI_MS: u128 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    Success,
    Fail,
}

impl SampleStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SampleStatus::Success => "success",
            SampleStatus::Fail => "fail",
        }
    }
}

/// One measured operation: a connect, or one probe round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: u64,
    pub latency: Duration,
    pub status: SampleStatus,
    pub error: Option<WorkerError>,
}

impl Sample {
    #[must_use]
    pub const fn success(id: u64, latency: Duration) -> Self {
        Self {
            id,
            latency,
            status: SampleStatus::Success,
            error: None,
        }
    }

    #[must_use]
    pub const fn failure(id: u64, latency: Duration, error: WorkerError) -> Self {
        Self {
            id,
            latency,
            status: SampleStatus::Fail,
            error: Some(error),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, SampleStatus::Success)
    }

    /// Latency in milliseconds with two decimals, e.g. `12.34`.
    #[must_use]
    pub fn latency_ms(&self) -> String {
        format_ms(self.latency)
    }

    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Formats a duration as milliseconds with two decimals.
#[must_use]
pub fn format_ms(duration: Duration) -> String {
    let micros = duration.as_micros();
    let whole = micros.checked_div(US_PER_MS).unwrap_or(0);
    let fraction = micros
        .checked_rem(US_PER_MS)
        .and_then(|rest| rest.checked_div(US_PER_CENTI_MS))
        .unwrap_or(0);
    format!("{}.{:02}", whole, fraction)
}

use std::time::Duration;

/// Microseconds per millisecond.
const US_PER_MS: i64 = 1_000;

/// One timestamped probe: `"<MESSAGE> <client_id> <send_timestamp_ms>\n"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMessage<'msg> {
    pub message: &'msg str,
    pub client_id: u64,
    pub sent_at_ms: i64,
}

impl<'msg> ProbeMessage<'msg> {
    /// Stamps a probe with the current wall-clock time.
    #[must_use]
    pub fn now(message: &'msg str, client_id: u64) -> Self {
        Self {
            message,
            client_id,
            sent_at_ms: wall_clock_ms(),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        format!("{} {} {}\n", self.message, self.client_id, self.sent_at_ms)
    }

    /// Round trip from the embedded send timestamp to `received_at_us`.
    ///
    /// The embedded timestamp is truncated to whole milliseconds, so against a
    /// shared clock the result is never negative; a clock stepping backwards
    /// is clamped to zero.
    #[must_use]
    pub fn round_trip(&self, received_at_us: i64) -> Duration {
        let sent_at_us = self.sent_at_ms.saturating_mul(US_PER_MS);
        let elapsed_us = received_at_us.saturating_sub(sent_at_us).max(0);
        Duration::from_micros(u64::try_from(elapsed_us).unwrap_or(0))
    }
}

#[must_use]
pub fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[must_use]
pub fn wall_clock_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

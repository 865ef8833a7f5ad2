use std::time::Duration;

use crate::runtime::{RunOutcome, WorkerReport};
use crate::samples::format_ms;

/// Percent values are carried as hundredths (`9950` is `99.50%`).
const PERCENT_SCALE_X100: u128 = 10_000;
const PERCENT_DIVISOR: u64 = 100;

/// `part / whole` as a percentage in hundredths; zero when `whole` is zero.
#[must_use]
pub fn success_rate_x100(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    let scaled = u128::from(part)
        .saturating_mul(PERCENT_SCALE_X100)
        .checked_div(u128::from(whole))
        .unwrap_or(0);
    u64::try_from(scaled).map_or(u64::MAX, |value| value)
}

/// Formats a hundredths percentage as `"99.50"`.
#[must_use]
pub fn format_rate(rate_x100: u64) -> String {
    format!(
        "{}.{:02}",
        rate_x100.checked_div(PERCENT_DIVISOR).unwrap_or(0),
        rate_x100.checked_rem(PERCENT_DIVISOR).unwrap_or(0)
    )
}

/// Count, min, max, mean and sample standard deviation of a latency set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub std_dev: Duration,
}

impl LatencyStats {
    /// Returns `None` for an empty set. The deviation is zero for one value.
    #[must_use]
    pub fn from_latencies<I>(latencies: I) -> Option<Self>
    where
        I: IntoIterator<Item = Duration>,
    {
        let micros: Vec<u128> = latencies
            .into_iter()
            .map(|latency| latency.as_micros())
            .collect();
        let min = *micros.iter().min()?;
        let max = *micros.iter().max()?;
        let count = u128::try_from(micros.len()).ok()?;
        let total = micros
            .iter()
            .fold(0_u128, |acc, value| acc.saturating_add(*value));
        let mean = total.checked_div(count)?;

        let std_dev = match count.checked_sub(1) {
            Some(degrees) if degrees > 0 => {
                let squares = micros.iter().fold(0_u128, |acc, value| {
                    let delta = value.abs_diff(mean);
                    acc.saturating_add(delta.saturating_mul(delta))
                });
                squares.checked_div(degrees).unwrap_or(0).isqrt()
            }
            _ => 0,
        };

        Some(Self {
            count: u64::try_from(count).unwrap_or(u64::MAX),
            min: duration_from_micros(min),
            max: duration_from_micros(max),
            avg: duration_from_micros(mean),
            std_dev: duration_from_micros(std_dev),
        })
    }
}

fn duration_from_micros(micros: u128) -> Duration {
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}

/// Totals over every sample of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate_x100: u64,
    /// Latency statistics over successful samples only.
    pub success_latency: Option<LatencyStats>,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub aborted_lanes: usize,
    pub probe: ProbeTotals,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let total = u64::try_from(outcome.samples.len()).unwrap_or(u64::MAX);
        let success = u64::try_from(outcome.success_count()).unwrap_or(u64::MAX);
        let success_latency = LatencyStats::from_latencies(
            outcome
                .samples
                .iter()
                .filter(|sample| sample.is_success())
                .map(|sample| sample.latency),
        );
        Self {
            total,
            success,
            failed: total.saturating_sub(success),
            success_rate_x100: success_rate_x100(success, total),
            success_latency,
            elapsed: outcome.elapsed,
            cancelled: outcome.cancelled,
            aborted_lanes: outcome.aborted_lanes,
            probe: ProbeTotals::from_workers(&outcome.workers),
        }
    }
}

/// Sent/received totals of a probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTotals {
    pub clients: u64,
    pub sent: u64,
    pub received: u64,
    /// Received over sent, in hundredths of a percent.
    pub echo_rate_x100: u64,
    pub rtt: Option<LatencyStats>,
}

impl ProbeTotals {
    #[must_use]
    pub fn from_workers(workers: &[WorkerReport]) -> Self {
        let sent = workers
            .iter()
            .fold(0_u64, |acc, report| acc.saturating_add(report.sent));
        let received = workers
            .iter()
            .fold(0_u64, |acc, report| acc.saturating_add(report.received));
        Self {
            clients: u64::try_from(workers.len()).unwrap_or(u64::MAX),
            sent,
            received,
            echo_rate_x100: success_rate_x100(received, sent),
            rtt: LatencyStats::from_latencies(
                workers
                    .iter()
                    .flat_map(|report| report.rtt_samples.iter().copied()),
            ),
        }
    }
}

/// One per-client row of the probe detail export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRow {
    pub client_id: u64,
    pub sent: u64,
    pub received: u64,
    pub success_rate_x100: u64,
    pub avg_rtt: Duration,
}

impl WorkerRow {
    #[must_use]
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.client_id,
            self.sent,
            self.received,
            format_rate(self.success_rate_x100),
            format_ms(self.avg_rtt)
        )
    }
}

#[must_use]
pub fn worker_rows(workers: &[WorkerReport]) -> Vec<WorkerRow> {
    workers
        .iter()
        .map(|report| WorkerRow {
            client_id: report.id,
            sent: report.sent,
            received: report.received,
            success_rate_x100: success_rate_x100(report.received, report.sent),
            avg_rtt: report.avg_rtt().unwrap_or(Duration::ZERO),
        })
        .collect()
}

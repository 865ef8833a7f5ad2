use std::time::Duration;

use tokio::time::{Instant, timeout};
use tracing::debug;

use crate::error::WorkerError;
use crate::samples::Sample;

use super::transport::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Pending,
    Connecting,
    Active,
    Closing,
    Terminated,
}

impl Lifecycle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Pending => "pending",
            Lifecycle::Connecting => "connecting",
            Lifecycle::Active => "active",
            Lifecycle::Closing => "closing",
            Lifecycle::Terminated => "terminated",
        }
    }
}

/// Runtime state of one worker. Never shared: the connection, counters and
/// RTT list are only touched by the owning worker.
pub(super) struct WorkerState {
    pub(super) identity: u64,
    pub(super) connection: Option<Box<dyn Connection>>,
    pub(super) sent: u64,
    pub(super) received: u64,
    pub(super) rtt_samples: Vec<Duration>,
    pub(super) lifecycle: Lifecycle,
}

impl WorkerState {
    pub(super) const fn new(identity: u64) -> Self {
        Self {
            identity,
            connection: None,
            sent: 0,
            received: 0,
            rtt_samples: Vec::new(),
            lifecycle: Lifecycle::Pending,
        }
    }

    pub(super) fn transition(&mut self, next: Lifecycle) {
        debug!(
            worker = self.identity,
            from = self.lifecycle.as_str(),
            to = next.as_str(),
            "Lifecycle transition"
        );
        self.lifecycle = next;
    }

    /// Closes the connection if one is still held. Safe to call repeatedly:
    /// the handle is taken on the first call, so it is closed at most once.
    pub(super) async fn release(&mut self, limit: Duration) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        match timeout(limit, connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(worker = self.identity, "Close error: {}", err),
            Err(_) => debug!(worker = self.identity, "Close timed out"),
        }
    }
}

/// Final state of a worker, handed back to the scheduler.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub id: u64,
    pub sent: u64,
    pub received: u64,
    pub rtt_samples: Vec<Duration>,
    pub lifecycle: Lifecycle,
    /// Whether the worker stopped because the run was cancelled.
    pub cancelled: bool,
    /// The failure that ended the worker, if any.
    pub error: Option<WorkerError>,
    pub started_at: Instant,
    pub finished_at: Instant,
}

impl WorkerReport {
    #[must_use]
    pub fn avg_rtt(&self) -> Option<Duration> {
        let count = u32::try_from(self.rtt_samples.len()).ok()?;
        let total: Duration = self.rtt_samples.iter().sum();
        total.checked_div(count)
    }
}

/// Everything a run produced, in a stable order.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Samples of this run in sink insertion order.
    pub samples: Vec<Sample>,
    /// One report per started worker, sorted by id.
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
    /// Whether the deadline or an external shutdown cancelled the run.
    pub cancelled: bool,
    /// Lanes still running at the hard drain bound and therefore aborted.
    pub aborted_lanes: usize,
    /// Lanes whose task failed (panicked) instead of returning reports.
    pub failed_lanes: usize,
}

impl RunOutcome {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.samples.iter().filter(|sample| sample.is_success()).count()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.samples.len().saturating_sub(self.success_count())
    }
}

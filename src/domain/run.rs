use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::ValidationError;

/// Connect timeout used by both original benchmark scripts.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-exchange timeout for a probe round trip.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between two probes of the same client.
pub const DEFAULT_MESSAGE_INTERVAL: Duration = Duration::from_millis(100);
/// Probe-mode run length.
pub const DEFAULT_TOTAL_DURATION: Duration = Duration::from_secs(10);
/// Extra time granted to stragglers after the per-op timeouts have elapsed.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(1);
/// Pool size for parallel connect benchmarks when no bound is given.
pub const DEFAULT_PARALLEL_CONNECT_LANES: usize = 50;
pub const DEFAULT_MESSAGE: &str = "PING";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Connect, close, record the connect latency.
    Connect,
    /// Stay connected and time line-echo round trips until the deadline.
    Probe,
}

impl RunMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunMode::Connect => "connect",
            RunMode::Probe => "probe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// One worker at a time; the next starts after the previous terminates.
    Sequential,
    /// Up to `max` workers at once, or one task per connection when `None`.
    Parallel { max: Option<NonZeroUsize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: Target,
    pub mode: RunMode,
    pub connections: NonZeroUsize,
    pub concurrency: Concurrency,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub message: String,
    pub message_interval: Duration,
    pub total_duration: Duration,
    pub drain_grace: Duration,
}

impl RunConfig {
    /// Builds a configuration with the stock timings for `mode`.
    ///
    /// Connect runs default to sequential, probe runs to unbounded fan-out.
    #[must_use]
    pub fn new(target: Target, mode: RunMode, connections: NonZeroUsize) -> Self {
        let concurrency = match mode {
            RunMode::Connect => Concurrency::Sequential,
            RunMode::Probe => Concurrency::Parallel { max: None },
        };
        Self {
            target,
            mode,
            connections,
            concurrency,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            message: DEFAULT_MESSAGE.to_owned(),
            message_interval: DEFAULT_MESSAGE_INTERVAL,
            total_duration: DEFAULT_TOTAL_DURATION,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    #[must_use]
    pub const fn with_pacing(mut self, interval: Duration, total: Duration) -> Self {
        self.message_interval = interval;
        self.total_duration = total;
        self
    }

    #[must_use]
    pub const fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Checks the values the worker relies on.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty host, port 0, a probe message that is
    /// empty or spans lines, zero timeouts, or a sequential probe run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        if self.target.port == 0 {
            return Err(ValidationError::PortZero);
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(ValidationError::DurationZero);
        }
        if self.mode == RunMode::Probe {
            if self.message.is_empty() || self.message.contains(['\n', '\r']) {
                return Err(ValidationError::InvalidProbeMessage);
            }
            if self.concurrency == Concurrency::Sequential {
                return Err(ValidationError::SequentialProbe);
            }
            if self.total_duration.is_zero() {
                return Err(ValidationError::DurationZero);
            }
        }
        Ok(())
    }

    /// Number of scheduler lanes (tasks that run workers back to back).
    #[must_use]
    pub fn lane_count(&self) -> usize {
        let connections = self.connections.get();
        match self.concurrency {
            Concurrency::Sequential => 1,
            Concurrency::Parallel { max: Some(max) } => max.get().min(connections),
            Concurrency::Parallel { max: None } => connections,
        }
    }

    /// Global deadline measured from the start of the run, probe mode only.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        match self.mode {
            RunMode::Probe => Some(self.total_duration),
            RunMode::Connect => None,
        }
    }

    /// Upper bound on how long the scheduler waits for workers after
    /// cancellation before aborting them.
    #[must_use]
    pub fn drain_bound(&self) -> Duration {
        self.connect_timeout
            .max(self.read_timeout)
            .saturating_add(self.drain_grace)
    }

    /// Limit on closing one connection: half the drain grace, so a worker
    /// whose last exchange ends right at its timeout still finishes inside
    /// `drain_bound()`.
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        self.drain_grace.checked_div(2).unwrap_or(self.drain_grace)
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, info};

use crate::domain::{RunConfig, RunMode};
use crate::error::{IoOperation, WorkerError};
use crate::samples::{Sample, SampleSink};
use crate::shutdown::CancelToken;

use super::probe::{ProbeMessage, wall_clock_us};
use super::transport::{Connection, Connector};
use super::types::{Lifecycle, WorkerReport, WorkerState};

/// Shared, read-only inputs of every worker in a run.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) config: Arc<RunConfig>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) sink: Arc<dyn SampleSink>,
}

/// Connects within `connect_timeout`. Borrows only the shared context so the
/// worker itself is never held across the await.
async fn connect(ctx: &WorkerContext) -> Result<Box<dyn Connection>, WorkerError> {
    let limit = ctx.config.connect_timeout;
    match timeout(limit, ctx.connector.connect(&ctx.config.target)).await {
        Ok(Ok(connection)) => Ok(connection),
        Ok(Err(err)) => Err(WorkerError::connect(&err)),
        Err(_) => Err(WorkerError::connect_timeout(limit)),
    }
}

/// Drives one connection from `Pending` to `Terminated`.
pub(crate) struct ConnectionWorker {
    state: WorkerState,
    ctx: WorkerContext,
    cancel: CancelToken,
    cancelled: bool,
    error: Option<WorkerError>,
}

impl ConnectionWorker {
    pub(crate) fn new(identity: u64, ctx: &WorkerContext, cancel: CancelToken) -> Self {
        Self {
            state: WorkerState::new(identity),
            ctx: ctx.clone(),
            cancel,
            cancelled: false,
            error: None,
        }
    }

    pub(crate) async fn run(mut self) -> WorkerReport {
        let started_at = Instant::now();
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            return self.terminate(started_at).await;
        }

        self.state.transition(Lifecycle::Connecting);
        match connect(&self.ctx).await {
            Ok(connection) => self.state.connection = Some(connection),
            Err(err) => {
                self.fail(started_at.elapsed(), err);
                return self.terminate(started_at).await;
            }
        }

        match self.ctx.config.mode {
            RunMode::Connect => {
                self.state.transition(Lifecycle::Closing);
                self.state.release(self.ctx.config.close_timeout()).await;
                self.record(Sample::success(self.state.identity, started_at.elapsed()));
            }
            RunMode::Probe => {
                self.state.transition(Lifecycle::Active);
                info!(
                    "Client-{:04} connected to {}",
                    self.state.identity, self.ctx.config.target
                );
                self.probe_loop().await;
            }
        }

        self.terminate(started_at).await
    }

    async fn probe_loop(&mut self) {
        let active_since = Instant::now();
        let total = self.ctx.config.total_duration;
        let interval = self.ctx.config.message_interval;

        loop {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                break;
            }
            if active_since.elapsed() >= total {
                break;
            }

            let iteration_start = Instant::now();
            match self.exchange().await {
                Ok(rtt) => {
                    self.state.received = self.state.received.saturating_add(1);
                    self.state.rtt_samples.push(rtt);
                    self.record(Sample::success(self.state.identity, rtt));
                }
                Err(err) => {
                    self.fail(iteration_start.elapsed(), err);
                    break;
                }
            }

            let cancelled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => true,
                () = sleep(interval) => false,
            };
            if cancelled {
                self.cancelled = true;
                break;
            }
        }

        self.state.transition(Lifecycle::Closing);
    }

    /// Sends one probe and waits for one response line. Write and read share
    /// a single `read_timeout` budget.
    async fn exchange(&mut self) -> Result<Duration, WorkerError> {
        let read_timeout = self.ctx.config.read_timeout;
        let Some(connection) = self.state.connection.as_mut() else {
            return Err(WorkerError::IoError {
                operation: IoOperation::Write,
                detail: "connection already released".to_owned(),
            });
        };
        let now = Instant::now();
        let deadline = now.checked_add(read_timeout).unwrap_or(now);

        let probe = ProbeMessage::now(&self.ctx.config.message, self.state.identity);
        let line = probe.encode();
        match timeout_at(deadline, connection.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(WorkerError::io(IoOperation::Write, &err)),
            Err(_) => {
                return Err(WorkerError::IoTimeout {
                    operation: IoOperation::Write,
                });
            }
        }
        self.state.sent = self.state.sent.saturating_add(1);

        let mut response = String::new();
        match timeout_at(deadline, connection.read_line(&mut response)).await {
            Ok(Ok(0)) => Err(WorkerError::IoError {
                operation: IoOperation::Read,
                detail: "connection closed by peer".to_owned(),
            }),
            Ok(Ok(_)) if !response.ends_with('\n') => Err(WorkerError::IoError {
                operation: IoOperation::Read,
                detail: "connection closed mid-line".to_owned(),
            }),
            Ok(Ok(_)) => Ok(probe.round_trip(wall_clock_us())),
            Ok(Err(err)) => Err(WorkerError::io(IoOperation::Read, &err)),
            Err(_) => Err(WorkerError::IoTimeout {
                operation: IoOperation::Read,
            }),
        }
    }

    fn record(&self, sample: Sample) {
        self.ctx.sink.record(sample);
    }

    fn fail(&mut self, latency: Duration, err: WorkerError) {
        self.record(Sample::failure(self.state.identity, latency, err.clone()));
        self.error = Some(err);
    }

    async fn terminate(mut self, started_at: Instant) -> WorkerReport {
        self.state.release(self.ctx.config.close_timeout()).await;
        self.state.transition(Lifecycle::Terminated);

        if self.ctx.config.mode == RunMode::Probe {
            info!(
                "Client-{:04} stopped. Sent: {}, Received: {}",
                self.state.identity, self.state.sent, self.state.received
            );
        } else {
            debug!(worker = self.state.identity, "Worker terminated");
        }

        WorkerReport {
            id: self.state.identity,
            sent: self.state.sent,
            received: self.state.received,
            rtt_samples: std::mem::take(&mut self.state.rtt_samples),
            lifecycle: self.state.lifecycle,
            cancelled: self.cancelled,
            error: self.error,
            started_at,
            finished_at: Instant::now(),
        }
    }
}

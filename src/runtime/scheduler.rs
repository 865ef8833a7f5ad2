use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::domain::RunConfig;
use crate::error::{AppResult, SchedulerError};
use crate::samples::SampleSink;
use crate::shutdown::{CancelToken, CancelTrigger, ShutdownReceiver};

use super::transport::{Connector, TcpConnector};
use super::types::{RunOutcome, WorkerReport};
use super::worker::{ConnectionWorker, WorkerContext};

/// Hands out worker ids `0..limit`, each exactly once.
#[derive(Debug)]
pub(super) struct WorkQueue {
    limit: u64,
    next: AtomicU64,
}

impl WorkQueue {
    pub(super) const fn new(limit: u64) -> Self {
        Self {
            limit,
            next: AtomicU64::new(0),
        }
    }

    pub(super) fn take(&self) -> Option<u64> {
        loop {
            let current = self.next.load(Ordering::Relaxed);
            if current >= self.limit {
                return None;
            }
            let next = current.checked_add(1)?;
            if self
                .next
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Some(current);
            }
        }
    }
}

/// Fans a run out over lanes of workers and collects what they produce.
#[derive(Clone)]
pub struct Scheduler {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn SampleSink>,
}

impl Scheduler {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, sink: Arc<dyn SampleSink>) -> Self {
        Self { connector, sink }
    }

    /// Scheduler over plain TCP connections.
    #[must_use]
    pub fn tcp(sink: Arc<dyn SampleSink>) -> Self {
        Self::new(Arc::new(TcpConnector), sink)
    }

    /// Runs every connection of `config` and waits for the lanes to drain.
    ///
    /// In probe mode the run is cancelled at `total_duration`. A message on
    /// `shutdown` cancels the run in either mode. After cancellation the
    /// lanes get `drain_bound()` to finish before they are aborted.
    ///
    /// # Errors
    ///
    /// Returns an error when `config` is invalid, or when every lane task
    /// failed without returning its reports.
    pub async fn run_all(
        &self,
        config: &RunConfig,
        shutdown: Option<ShutdownReceiver>,
    ) -> AppResult<RunOutcome> {
        config.validate()?;

        let lanes = config.lane_count();
        let connections = u64::try_from(config.connections.get()).unwrap_or(u64::MAX);
        let sample_offset = self.sink.len();
        let trigger = CancelTrigger::new();
        let ctx = WorkerContext {
            config: Arc::new(config.clone()),
            connector: Arc::clone(&self.connector),
            sink: Arc::clone(&self.sink),
        };
        let queue = Arc::new(WorkQueue::new(connections));

        info!(
            "Starting {} run against {}: {} connection(s) on {} lane(s)",
            config.mode.as_str(),
            config.target,
            connections,
            lanes
        );

        let started_at = Instant::now();
        let mut tasks = JoinSet::new();
        for lane in 0..lanes {
            tasks.spawn(run_lane(
                lane,
                ctx.clone(),
                Arc::clone(&queue),
                trigger.token(),
            ));
        }

        let deadline = config
            .deadline()
            .and_then(|total| started_at.checked_add(total));
        let mut drain = Drain::new(config.drain_bound());
        let mut shutdown = shutdown;
        let mut workers: Vec<WorkerReport> = Vec::new();
        let mut failed_lanes: usize = 0;
        let mut aborted_lanes: usize = 0;

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match joined {
                        Ok(reports) => workers.extend(reports),
                        Err(err) if err.is_cancelled() => {
                            aborted_lanes = aborted_lanes.saturating_add(1);
                        }
                        Err(err) => {
                            error!("Worker lane failed: {}", err);
                            failed_lanes = failed_lanes.saturating_add(1);
                        }
                    }
                }
                () = sleep_until(deadline.unwrap_or(started_at)), if deadline.is_some() && !drain.started() => {
                    info!("Run deadline reached; cancelling workers");
                    drain.start(&trigger);
                }
                () = wait_for_shutdown(&mut shutdown), if !drain.started() => {
                    info!("Shutdown requested; cancelling workers");
                    drain.start(&trigger);
                }
                () = sleep_until(drain.abort_at().unwrap_or(started_at)), if drain.abort_pending() => {
                    warn!(
                        "{} lane(s) still running {}ms after cancellation; aborting",
                        tasks.len(),
                        drain.bound.as_millis()
                    );
                    tasks.abort_all();
                    drain.aborted = true;
                }
            }
        }

        if failed_lanes >= lanes && lanes > 0 {
            return Err(SchedulerError::NoLaneCompleted {
                lanes,
                failed: failed_lanes,
            }
            .into());
        }

        workers.sort_by_key(|report| report.id);
        let samples = self
            .sink
            .snapshot()
            .into_iter()
            .skip(sample_offset)
            .collect();
        let elapsed = started_at.elapsed();
        debug!(
            "Run finished in {}ms with {} worker report(s)",
            elapsed.as_millis(),
            workers.len()
        );

        Ok(RunOutcome {
            samples,
            workers,
            elapsed,
            cancelled: trigger.is_cancelled(),
            aborted_lanes,
            failed_lanes,
        })
    }
}

/// Cancellation bookkeeping: when it started and whether lanes were aborted.
struct Drain {
    bound: Duration,
    abort_at: Option<Instant>,
    aborted: bool,
}

impl Drain {
    const fn new(bound: Duration) -> Self {
        Self {
            bound,
            abort_at: None,
            aborted: false,
        }
    }

    const fn started(&self) -> bool {
        self.abort_at.is_some()
    }

    const fn abort_at(&self) -> Option<Instant> {
        self.abort_at
    }

    const fn abort_pending(&self) -> bool {
        self.abort_at.is_some() && !self.aborted
    }

    fn start(&mut self, trigger: &CancelTrigger) {
        trigger.cancel();
        let now = Instant::now();
        self.abort_at = Some(now.checked_add(self.bound).unwrap_or(now));
    }
}

async fn wait_for_shutdown(shutdown: &mut Option<ShutdownReceiver>) {
    let Some(receiver) = shutdown.as_mut() else {
        return pending().await;
    };
    match receiver.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => {
            debug!("Shutdown channel closed; run continues");
            *shutdown = None;
            pending::<()>().await;
        }
    }
}

async fn run_lane(
    lane: usize,
    ctx: WorkerContext,
    queue: Arc<WorkQueue>,
    token: CancelToken,
) -> Vec<WorkerReport> {
    let mut reports = Vec::new();
    loop {
        if token.is_cancelled() {
            debug!(lane, "Lane observed cancellation");
            break;
        }
        let Some(identity) = queue.take() else {
            break;
        };
        let worker = ConnectionWorker::new(identity, &ctx, token.clone());
        reports.push(worker.run().await);
    }
    debug!(lane, workers = reports.len(), "Lane finished");
    reports
}

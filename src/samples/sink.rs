use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::Sample;

/// Append-only store shared by every worker of a run.
///
/// `record` may be called from any number of tasks at once; no sample may be
/// lost or duplicated. `snapshot` is meant to be read after all writers are
/// done, and returns samples in insertion order.
pub trait SampleSink: Send + Sync {
    fn record(&self, sample: Sample);

    fn snapshot(&self) -> Vec<Sample>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Mutex<Vec<Sample>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Poison is ignored: a panicking push never leaves a partial element.
    fn lock(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSink for MemorySink {
    fn record(&self, sample: Sample) {
        self.lock().push(sample);
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Logs each sample as it is recorded, then hands it to the inner sink.
#[derive(Debug)]
pub struct TracingSink<S> {
    inner: S,
}

impl<S> TracingSink<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: SampleSink> SampleSink for TracingSink<S> {
    fn record(&self, sample: Sample) {
        match sample.error.as_ref() {
            None => debug!("[{:>4}] ok   {:>8} ms", sample.id, sample.latency_ms()),
            Some(err) => info!(
                kind = err.kind(),
                "[{:>4}] fail {:>8} ms | {}",
                sample.id,
                sample.latency_ms(),
                err
            ),
        }
        self.inner.record(sample);
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.inner.snapshot()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

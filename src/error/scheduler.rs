use thiserror::Error;

/// Fatal conditions of a whole run. Individual worker failures never end up
/// here; they are recorded as samples.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("No worker lane completed: {failed} of {lanes} lane task(s) failed.")]
    NoLaneCompleted { lanes: usize, failed: usize },
}

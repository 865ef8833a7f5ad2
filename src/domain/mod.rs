//! Immutable description of a single benchmark run.
mod run;

pub use run::{
    Concurrency, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DRAIN_GRACE, DEFAULT_MESSAGE,
    DEFAULT_MESSAGE_INTERVAL, DEFAULT_PARALLEL_CONNECT_LANES, DEFAULT_READ_TIMEOUT,
    DEFAULT_TOTAL_DURATION, RunConfig, RunMode, Target,
};

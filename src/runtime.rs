//! The connection driver: transport, workers and the scheduler fanning them out.
mod probe;
mod scheduler;
mod transport;
mod types;
mod worker;

#[cfg(test)]
mod tests;

pub use probe::{ProbeMessage, wall_clock_ms, wall_clock_us};
pub use scheduler::Scheduler;
pub use transport::{Connection, Connector, MAX_RESPONSE_LINE, TcpConnector};
pub use types::{Lifecycle, RunOutcome, WorkerReport};

//! Aggregates, summary lines and file exports for a finished run.
mod export;
mod stats;
mod summary;

#[cfg(test)]
mod tests;

pub use export::{CONNECT_CSV_FILE, PROBE_CSV_FILE, SUMMARY_JSON_FILE, export_run};
pub use stats::{
    LatencyStats, ProbeTotals, RunSummary, WorkerRow, format_rate, success_rate_x100, worker_rows,
};
pub use summary::{print_summary, summary_lines};

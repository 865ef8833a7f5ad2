use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::args::BenchArgs;
use crate::error::AppResult;
use crate::report::{RunSummary, export_run, print_summary};
use crate::runtime::{RunOutcome, Scheduler};
use crate::samples::{MemorySink, TracingSink};
use crate::shutdown::shutdown_channel;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

/// Runs one benchmark, prints its summary and writes the exports.
///
/// Worker failures only show up in the outcome; the run itself succeeds.
pub(crate) async fn run_bench(args: &BenchArgs) -> AppResult<RunOutcome> {
    let config = args.run_config()?;
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let sink = Arc::new(TracingSink::new(MemorySink::new()));
    let scheduler = Scheduler::tcp(sink);
    let outcome = scheduler.run_all(&config, Some(shutdown_rx)).await;
    signal_handle.abort();
    let outcome = outcome?;

    if outcome.failed_lanes > 0 {
        warn!("{} worker lane(s) failed; results are partial", outcome.failed_lanes);
    }

    let summary = RunSummary::from_outcome(&outcome);
    if !args.quiet {
        print_summary(&config, &summary);
    }

    if let Some(dir) = args.output_dir.as_deref() {
        let written = export_run(Path::new(dir), &config, &outcome, &summary).await?;
        info!("{} report file(s) saved in {}", written.len(), dir);
    }

    Ok(outcome)
}

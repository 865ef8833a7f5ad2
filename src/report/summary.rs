use std::time::Duration;

use crate::domain::{RunConfig, RunMode};
use crate::samples::format_ms;

use super::stats::{LatencyStats, RunSummary, format_rate};

/// Milliseconds per second.
const MS_PER_SEC: u128 = 1_000;
/// Hundredths of a second per millisecond.
const MS_PER_CENTI_SEC: u128 = 10;
const RULE_WIDTH: usize = 60;

/// Console summary for a finished run.
#[must_use]
pub fn summary_lines(config: &RunConfig, summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("-".repeat(RULE_WIDTH));
    match config.mode {
        RunMode::Connect => connect_lines(summary, &mut lines),
        RunMode::Probe => probe_lines(config, summary, &mut lines),
    }
    if summary.cancelled && config.mode == RunMode::Connect {
        lines.push("Run was interrupted before every connection was attempted.".to_owned());
    }
    if summary.aborted_lanes > 0 {
        lines.push(format!(
            "Aborted lanes: {} (still running at the drain bound)",
            summary.aborted_lanes
        ));
    }
    lines.push("-".repeat(RULE_WIDTH));
    lines
}

fn connect_lines(summary: &RunSummary, lines: &mut Vec<String>) {
    lines.push("Test Results:".to_owned());
    lines.push(format!("  Total Attempts: {}", summary.total));
    lines.push(format!(
        "  Success: {} | Failed: {}",
        summary.success, summary.failed
    ));
    lines.push(format!(
        "  Success Rate: {}%",
        format_rate(summary.success_rate_x100)
    ));
    let stats = summary.success_latency.unwrap_or(EMPTY_STATS);
    lines.push(format!("  Average Latency: {} ms", format_ms(stats.avg)));
    lines.push(format!(
        "  Min: {} ms | Max: {} ms",
        format_ms(stats.min),
        format_ms(stats.max)
    ));
    lines.push(format!("  Std Dev: {} ms", format_ms(stats.std_dev)));
    lines.push(format!("  Total Time: {} seconds", format_secs(summary.elapsed)));
}

fn probe_lines(config: &RunConfig, summary: &RunSummary, lines: &mut Vec<String>) {
    let probe = &summary.probe;
    lines.push("STRESS TEST COMPLETED".to_owned());
    lines.push(format!(
        "Duration: {}s | Clients: {}",
        format_duration_secs(config.total_duration),
        probe.clients
    ));
    lines.push(format!("Total Sent: {}", probe.sent));
    lines.push(format!("Total Received: {}", probe.received));
    lines.push(format!("Success Rate: {}%", format_rate(probe.echo_rate_x100)));
    let rtt = probe.rtt.unwrap_or(EMPTY_STATS);
    lines.push(format!(
        "RTT Avg: {}ms | Min: {}ms | Max: {}ms",
        format_ms(rtt.avg),
        format_ms(rtt.min),
        format_ms(rtt.max)
    ));
    if summary.failed > 0 {
        lines.push(format!("Failed exchanges: {}", summary.failed));
    }
    lines.push(format!("Total Time: {} seconds", format_secs(summary.elapsed)));
}

const EMPTY_STATS: LatencyStats = LatencyStats {
    count: 0,
    min: Duration::ZERO,
    max: Duration::ZERO,
    avg: Duration::ZERO,
    std_dev: Duration::ZERO,
};

/// Whole seconds print bare ("10"), anything finer as `format_secs`.
fn format_duration_secs(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        duration.as_secs().to_string()
    } else {
        format_secs(duration)
    }
}

fn format_secs(duration: Duration) -> String {
    let millis = duration.as_millis();
    format!(
        "{}.{:02}",
        millis.checked_div(MS_PER_SEC).unwrap_or(0),
        millis
            .checked_rem(MS_PER_SEC)
            .and_then(|rest| rest.checked_div(MS_PER_CENTI_SEC))
            .unwrap_or(0)
    )
}

pub fn print_summary(config: &RunConfig, summary: &RunSummary) {
    for line in summary_lines(config, summary) {
        println!("{}", line);
    }
}

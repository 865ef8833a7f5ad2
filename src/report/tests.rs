use std::num::NonZeroUsize;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::Instant;

use super::*;
use crate::domain::{RunConfig, RunMode, Target};
use crate::error::{AppError, AppResult, WorkerError};
use crate::runtime::{Lifecycle, RunOutcome, WorkerReport};
use crate::samples::Sample;

fn run_config(mode: RunMode) -> AppResult<RunConfig> {
    let connections =
        NonZeroUsize::new(3).ok_or_else(|| AppError::validation("zero connections"))?;
    Ok(RunConfig::new(Target::new("127.0.0.1", 5050), mode, connections))
}

fn report(id: u64, sent: u64, received: u64, rtts_ms: &[u64]) -> WorkerReport {
    let now = Instant::now();
    WorkerReport {
        id,
        sent,
        received,
        rtt_samples: rtts_ms.iter().copied().map(Duration::from_millis).collect(),
        lifecycle: Lifecycle::Terminated,
        cancelled: false,
        error: None,
        started_at: now,
        finished_at: now,
    }
}

fn connect_outcome() -> RunOutcome {
    let refused = WorkerError::ConnectFailure {
        detail: "connection refused, os error 111".to_owned(),
    };
    RunOutcome {
        samples: vec![
            Sample::success(0, Duration::from_millis(10)),
            Sample::failure(1, Duration::from_micros(1_250), refused),
            Sample::success(2, Duration::from_millis(30)),
        ],
        workers: Vec::new(),
        elapsed: Duration::from_millis(1_234),
        cancelled: false,
        aborted_lanes: 0,
        failed_lanes: 0,
    }
}

#[test]
fn success_rate_is_fixed_point() -> AppResult<()> {
    let checks = [
        (success_rate_x100(2, 3) == 6_666, "2/3 must be 66.66%"),
        (success_rate_x100(5, 5) == 10_000, "5/5 must be 100%"),
        (success_rate_x100(0, 0) == 0, "Empty totals must be 0%"),
        (format_rate(6_666) == "66.66", "Unexpected rate format"),
        (format_rate(5) == "0.05", "Unexpected small rate format"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::validation(message));
        }
    }
    Ok(())
}

#[test]
fn latency_stats_match_sample_deviation() -> AppResult<()> {
    let stats = LatencyStats::from_latencies([10, 20, 30].map(Duration::from_millis))
        .ok_or_else(|| AppError::validation("Expected stats"))?;
    let expected = LatencyStats {
        count: 3,
        min: Duration::from_millis(10),
        max: Duration::from_millis(30),
        avg: Duration::from_millis(20),
        std_dev: Duration::from_millis(10),
    };
    if stats != expected {
        return Err(AppError::validation(format!("Unexpected stats {:?}", stats)));
    }

    let single = LatencyStats::from_latencies([Duration::from_millis(7)])
        .ok_or_else(|| AppError::validation("Expected single stats"))?;
    if single.std_dev != Duration::ZERO || single.avg != Duration::from_millis(7) {
        return Err(AppError::validation("Single value has no deviation"));
    }
    if LatencyStats::from_latencies(Vec::new()).is_some() {
        return Err(AppError::validation("Empty set has no stats"));
    }
    Ok(())
}

#[test]
fn connect_summary_lines() -> AppResult<()> {
    let config = run_config(RunMode::Connect)?;
    let summary = RunSummary::from_outcome(&connect_outcome());
    let lines = summary_lines(&config, &summary);

    let expected = [
        "  Total Attempts: 3",
        "  Success: 2 | Failed: 1",
        "  Success Rate: 66.66%",
        "  Average Latency: 20.00 ms",
        "  Min: 10.00 ms | Max: 30.00 ms",
        "  Std Dev: 14.14 ms",
        "  Total Time: 1.23 seconds",
    ];
    for line in expected {
        if !lines.iter().any(|candidate| candidate == line) {
            return Err(AppError::validation(format!(
                "Missing line {:?} in {:?}",
                line, lines
            )));
        }
    }
    Ok(())
}

#[test]
fn probe_totals_and_rows() -> AppResult<()> {
    let workers = vec![report(0, 10, 10, &[1, 2, 3]), report(1, 10, 9, &[4])];
    let totals = ProbeTotals::from_workers(&workers);
    if totals.sent != 20 || totals.received != 19 || totals.echo_rate_x100 != 9_500 {
        return Err(AppError::validation(format!("Unexpected totals {:?}", totals)));
    }
    let rtt = totals
        .rtt
        .ok_or_else(|| AppError::validation("Expected RTT stats"))?;
    if rtt.min != Duration::from_millis(1) || rtt.max != Duration::from_millis(4) {
        return Err(AppError::validation(format!("Unexpected RTT stats {:?}", rtt)));
    }

    let rows = worker_rows(&workers);
    let lines: Vec<String> = rows.iter().map(WorkerRow::csv_line).collect();
    if lines != ["0,10,10,100.00,2.00\n", "1,10,9,90.00,4.00\n"] {
        return Err(AppError::validation(format!("Unexpected rows {:?}", lines)));
    }
    Ok(())
}

#[test]
fn probe_summary_reports_echo_rate() -> AppResult<()> {
    let config = run_config(RunMode::Probe)?;
    let outcome = RunOutcome {
        samples: Vec::new(),
        workers: vec![report(0, 4, 3, &[2, 2, 2])],
        elapsed: Duration::from_secs(10),
        cancelled: true,
        aborted_lanes: 1,
        failed_lanes: 0,
    };
    let lines = summary_lines(&config, &RunSummary::from_outcome(&outcome));
    let expected = [
        "Duration: 10s | Clients: 1",
        "Total Sent: 4",
        "Total Received: 3",
        "Success Rate: 75.00%",
        "RTT Avg: 2.00ms | Min: 2.00ms | Max: 2.00ms",
        "Aborted lanes: 1 (still running at the drain bound)",
    ];
    for line in expected {
        if !lines.iter().any(|candidate| candidate == line) {
            return Err(AppError::validation(format!(
                "Missing line {:?} in {:?}",
                line, lines
            )));
        }
    }
    if lines.iter().any(|line| line.starts_with("Run was interrupted")) {
        return Err(AppError::validation("Deadline cancellation is not an interruption"));
    }
    Ok(())
}

#[test]
fn probe_summary_keeps_subsecond_duration() -> AppResult<()> {
    let config = run_config(RunMode::Probe)?
        .with_pacing(Duration::from_millis(100), Duration::from_millis(500));
    let outcome = RunOutcome {
        samples: Vec::new(),
        workers: vec![report(0, 5, 5, &[1, 1, 1, 1, 1])],
        elapsed: Duration::from_millis(520),
        cancelled: true,
        aborted_lanes: 0,
        failed_lanes: 0,
    };
    let lines = summary_lines(&config, &RunSummary::from_outcome(&outcome));
    if !lines.iter().any(|line| line == "Duration: 0.50s | Clients: 1") {
        return Err(AppError::validation(format!(
            "Sub-second duration lost in {:?}",
            lines
        )));
    }
    if !lines.iter().any(|line| line == "Total Time: 0.52 seconds") {
        return Err(AppError::validation(format!("Unexpected total time in {:?}", lines)));
    }
    Ok(())
}

#[tokio::test]
async fn export_writes_csv_and_json() -> AppResult<()> {
    let dir = tempdir()?;
    let out = dir.path().join("nested").join("report");
    let config = run_config(RunMode::Probe)?;
    let mut outcome = connect_outcome();
    outcome.workers = vec![report(0, 2, 2, &[3, 5])];
    let summary = RunSummary::from_outcome(&outcome);

    let written = export_run(&out, &config, &outcome, &summary).await?;
    if written.len() != 3 {
        return Err(AppError::validation(format!("Unexpected files {:?}", written)));
    }

    let samples = tokio::fs::read_to_string(out.join(CONNECT_CSV_FILE)).await?;
    let expected_samples = "id,latency_ms,status,error\n\
        0,10.00,success,\n\
        1,1.25,fail,\"connect failed: connection refused, os error 111\"\n\
        2,30.00,success,\n";
    if samples != expected_samples {
        return Err(AppError::validation(format!("Unexpected CSV {:?}", samples)));
    }

    let detail = tokio::fs::read_to_string(out.join(PROBE_CSV_FILE)).await?;
    if detail != "client_id,sent_count,recv_count,success_rate,avg_rtt_ms\n0,2,2,100.00,4.00\n" {
        return Err(AppError::validation(format!("Unexpected detail {:?}", detail)));
    }

    let json = tokio::fs::read_to_string(out.join(SUMMARY_JSON_FILE)).await?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|err| AppError::validation(format!("Invalid JSON: {}", err)))?;
    if value.get("success").and_then(serde_json::Value::as_u64) != Some(2)
        || value.get("mode").and_then(serde_json::Value::as_str) != Some("probe")
    {
        return Err(AppError::validation(format!("Unexpected summary {}", value)));
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::domain::{RunConfig, RunMode};
use crate::error::ReportError;
use crate::runtime::RunOutcome;
use crate::samples::{Sample, format_ms};

use super::stats::{LatencyStats, RunSummary, format_rate, worker_rows};

pub const CONNECT_CSV_FILE: &str = "latency_data.csv";
pub const PROBE_CSV_FILE: &str = "stress_test_detail.csv";
pub const SUMMARY_JSON_FILE: &str = "summary.json";

/// Writes the sample CSV, the per-client CSV (probe runs) and a JSON summary
/// into `dir`, creating it if needed. Returns the written paths.
///
/// # Errors
///
/// Returns an error when the directory or any file cannot be written.
pub async fn export_run(
    dir: &Path,
    config: &RunConfig,
    outcome: &RunOutcome,
    summary: &RunSummary,
) -> Result<Vec<PathBuf>, ReportError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ReportError::CreateOutputDir {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut written = Vec::with_capacity(3);

    let samples_path = dir.join(CONNECT_CSV_FILE);
    write_samples_csv(&samples_path, &outcome.samples)
        .await
        .map_err(|source| ReportError::WriteCsv {
            path: samples_path.clone(),
            source,
        })?;
    written.push(samples_path);

    if config.mode == RunMode::Probe {
        let detail_path = dir.join(PROBE_CSV_FILE);
        write_worker_csv(&detail_path, outcome)
            .await
            .map_err(|source| ReportError::WriteCsv {
                path: detail_path.clone(),
                source,
            })?;
        written.push(detail_path);
    }

    let summary_path = dir.join(SUMMARY_JSON_FILE);
    write_summary_json(&summary_path, config, summary)
        .await
        .map_err(|source| ReportError::WriteJson {
            path: summary_path.clone(),
            source,
        })?;
    written.push(summary_path);

    for path in &written {
        tracing::info!("Report written to {}", path.display());
    }
    Ok(written)
}

async fn write_samples_csv(path: &Path, samples: &[Sample]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(b"id,latency_ms,status,error\n").await?;
    for sample in samples {
        let line = format!(
            "{},{},{},{}\n",
            sample.id,
            sample.latency_ms(),
            sample.status.as_str(),
            csv_field(sample.error_detail().as_deref().unwrap_or(""))
        );
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_worker_csv(path: &Path, outcome: &RunOutcome) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(b"client_id,sent_count,recv_count,success_rate,avg_rtt_ms\n")
        .await?;
    for row in worker_rows(&outcome.workers) {
        writer.write_all(row.csv_line().as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_summary_json(
    path: &Path,
    config: &RunConfig,
    summary: &RunSummary,
) -> Result<(), std::io::Error> {
    let elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX);
    let payload = serde_json::json!({
        "mode": config.mode.as_str(),
        "target": config.target.to_string(),
        "connections": config.connections.get(),
        "elapsed_ms": elapsed_ms,
        "cancelled": summary.cancelled,
        "aborted_lanes": summary.aborted_lanes,
        "total": summary.total,
        "success": summary.success,
        "failed": summary.failed,
        "success_rate": format_rate(summary.success_rate_x100),
        "latency_ms": stats_json(summary.success_latency.as_ref()),
        "probe": {
            "clients": summary.probe.clients,
            "sent": summary.probe.sent,
            "received": summary.probe.received,
            "success_rate": format_rate(summary.probe.echo_rate_x100),
            "rtt_ms": stats_json(summary.probe.rtt.as_ref()),
        },
    });

    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let json = serde_json::to_vec_pretty(&payload).map_err(std::io::Error::other)?;
    writer.write_all(&json).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn stats_json(stats: Option<&LatencyStats>) -> serde_json::Value {
    stats.map_or(serde_json::Value::Null, |stats| {
        serde_json::json!({
            "count": stats.count,
            "min": format_ms(stats.min),
            "max": format_ms(stats.max),
            "avg": format_ms(stats.avg),
            "std_dev": format_ms(stats.std_dev),
        })
    })
}

/// Quotes a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

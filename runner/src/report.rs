use crate::bench::{round2, BenchmarkResult};
use crate::database::stats::{IndexStats, TableStats};
use crate::database::KeyKind;
use chrono::Local;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report file")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub timestamp: String,
    pub total_records: usize,
    pub iterations: u32,
}

/// Everything a run produces; serialized as the JSON result document.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub db_version: String,
    pub uuid_v7_available: bool,
    pub table_stats: BTreeMap<String, TableStats>,
    /// ordered largest first, as collected
    pub index_stats: Vec<IndexStats>,
    pub test_results: Vec<BenchmarkResult>,
    pub comparative_results: Vec<Comparison>,
}

/// Serial vs UUID averages for one query shape. `diff_percent` is signed:
/// positive means the UUID variant was slower.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub test_type: String,
    pub serial_time: f64,
    pub uuid_time: f64,
    pub diff_percent: f64,
}

/// Pair serial and uuid results by the shape part of their names (the part
/// before ` - `). Shapes missing either variant are skipped.
pub fn compare(results: &[BenchmarkResult]) -> Vec<Comparison> {
    let mut shapes: Vec<(String, Option<f64>, Option<f64>)> = Vec::new();

    for result in results {
        let shape = result
            .name
            .split(" - ")
            .next()
            .unwrap_or(&result.name)
            .to_owned();

        let index = match shapes.iter().position(|(name, _, _)| *name == shape) {
            Some(index) => index,
            None => {
                shapes.push((shape, None, None));
                shapes.len() - 1
            }
        };
        match result.kind {
            KeyKind::Serial => shapes[index].1 = Some(result.avg_time_ms),
            KeyKind::Uuid => shapes[index].2 = Some(result.avg_time_ms),
        }
    }

    shapes
        .into_iter()
        .filter_map(|(shape, serial, uuid)| {
            let (serial, uuid) = (serial?, uuid?);

            Some(Comparison {
                test_type: shape,
                serial_time: serial,
                uuid_time: uuid,
                diff_percent: diff_percent(serial, uuid),
            })
        })
        .collect()
}

/// Signed relative slowdown of the UUID variant, in percent rounded to 2
/// decimal places.
pub fn diff_percent(serial_avg_ms: f64, uuid_avg_ms: f64) -> f64 {
    round2((uuid_avg_ms / serial_avg_ms - 1.0) * 100.0)
}

fn direction(diff_percent: f64) -> &'static str {
    if diff_percent > 0.0 {
        "slower"
    } else {
        "faster"
    }
}

/// Log the per-shape summaries and the comparison table.
pub fn log_comparative_results(comparisons: &[Comparison]) {
    info!("=== COMPARATIVE RESULTS ===");

    for comparison in comparisons {
        info!(
            shape = %comparison.test_type,
            serial_ms = comparison.serial_time,
            uuid_ms = comparison.uuid_time,
            "UUID is {}% {}",
            comparison.diff_percent,
            direction(comparison.diff_percent)
        );
    }

    info!("\n{}", render_table(comparisons));
}

/// Fixed-width comparison table for the console.
pub fn render_table(comparisons: &[Comparison]) -> String {
    let mut out = String::new();
    let line = format!(
        "+{}+{}+{}+{}+",
        "-".repeat(22),
        "-".repeat(18),
        "-".repeat(14),
        "-".repeat(10)
    );

    let _ = writeln!(out, "{line}");
    let _ = writeln!(
        out,
        "| {:<20} | {:>16} | {:>12} | {:>8} |",
        "Test Type", "Serial ID (ms)", "UUID (ms)", "Diff (%)"
    );
    let _ = writeln!(out, "{line}");

    for comparison in comparisons {
        let _ = writeln!(
            out,
            "| {:<20} | {:>16.2} | {:>12.2} | {:>8} |",
            comparison.test_type,
            comparison.serial_time,
            comparison.uuid_time,
            format!("{:+.2}%", comparison.diff_percent)
        );
    }
    let _ = write!(out, "{line}");

    out
}

/// Timestamp used in report file names, `YYYYMMDD_HHMMSS`.
pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Timestamp stored in the report metadata.
pub fn metadata_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug)]
pub struct SavedReport {
    pub json_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Persist the full JSON document and the condensed text summary, stamped
/// so consecutive runs do not collide.
pub fn save(report: &RunReport, dir: &Path, stamp: &str) -> Result<SavedReport, ReportError> {
    fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("performance_results_{stamp}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
    info!(path = %json_path.display(), "Saved results");

    let summary_path = dir.join(format!("performance_summary_{stamp}.txt"));
    fs::write(&summary_path, render_summary(report))?;
    info!(path = %summary_path.display(), "Saved summary");

    Ok(SavedReport {
        json_path,
        summary_path,
    })
}

/// Condensed human-readable report: metadata, table stats and comparative
/// results only.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== PERFORMANCE SUMMARY: SERIAL ID VS UUID ===");
    let _ = writeln!(out, "Date: {}", report.metadata.timestamp);
    let _ = writeln!(out, "PostgreSQL: {}", report.db_version);
    let _ = writeln!(out, "UUID v7 available: {}", report.uuid_v7_available);
    let _ = writeln!(out, "Total records: {}", report.metadata.total_records);

    let _ = writeln!(out, "\n=== TABLE STATISTICS ===");
    for (table, stats) in &report.table_stats {
        let _ = writeln!(out, "{table}:");
        let _ = writeln!(out, "  Rows: {}", stats.row_count);
        let _ = writeln!(out, "  Size: {}", stats.table_size);
        let _ = writeln!(out, "  Total size (with indexes): {}", stats.total_size);
    }

    let _ = writeln!(out, "\n=== COMPARATIVE RESULTS ===");
    for comparison in &report.comparative_results {
        let _ = writeln!(out, "{}:", comparison.test_type);
        let _ = writeln!(out, "  Serial: {} ms", comparison.serial_time);
        let _ = writeln!(out, "  UUID: {} ms", comparison.uuid_time);
        let _ = writeln!(
            out,
            "  Difference: UUID is {}% {}",
            comparison.diff_percent,
            direction(comparison.diff_percent)
        );
    }

    out
}

//! CSV results summary
//!
//! Renders the parsed per-iteration metrics into the two-section CSV the
//! analysis side expects: individual run rows first, then aggregated
//! statistics per metric. All cells are plain numbers or fixed labels, so
//! no CSV quoting is needed.

use crate::fio::{self, FioMetrics, FioParseError};
use crate::stats::MetricStats;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

/// Individual-run section column headers, with units
const RUN_HEADER: &str = "Run,Cpu Usr (%),Cpu Sys (%),Cpu Total (%),Bandwidth (MiB/s),Iops (ops/s),Avg Latency (ms),Stdev Latency (ms)";

/// Aggregated section column headers
const AGG_HEADER: &str = "Metric,Average,Std Dev,Unit,Min,Max";

/// Parse the raw iteration outputs `fio-output-{1..iterations}.json` in
/// `results_dir`.
///
/// Missing or unparseable files are skipped with a warning so one failed
/// iteration never hides the rest; zero parseable files is an error.
pub fn summarize(
    results_dir: &Path,
    iterations: u32,
) -> Result<Vec<(u32, FioMetrics)>, FioParseError> {
    let mut rows = Vec::new();

    for iteration in 1..=iterations {
        let path = results_dir.join(crate::defaults::fio_output_name(iteration));
        let metrics = fio::parse_file(&path).and_then(|output| FioMetrics::from_output(&output));
        match metrics {
            Ok(m) => rows.push((iteration, m)),
            Err(e) => {
                warn!(iteration, path = %path.display(), error = %e, "Skipping iteration output");
            }
        }
    }

    if rows.is_empty() {
        return Err(FioParseError::NoParseableOutputs {
            dir: results_dir.display().to_string(),
        });
    }

    Ok(rows)
}

/// Write the summary CSV for a set of parsed iterations
pub fn write_summary<W: Write>(w: &mut W, rows: &[(u32, FioMetrics)]) -> io::Result<()> {
    writeln!(w, "Individual Run Metrics")?;
    writeln!(w, "{}", RUN_HEADER)?;
    for (iteration, m) in rows {
        let (avg_lat, stdev_lat) = match m.latency {
            Some(lat) => (format!("{:.2}", lat.avg_ms), format!("{:.2}", lat.stdev_ms)),
            None => (String::new(), String::new()),
        };
        writeln!(
            w,
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{},{}",
            iteration, m.cpu_usr, m.cpu_sys, m.cpu_total, m.bandwidth_mib, m.iops, avg_lat,
            stdev_lat
        )?;
    }
    writeln!(w)?;

    writeln!(w, "Aggregated Metrics")?;
    writeln!(w, "{}", AGG_HEADER)?;

    let collect = |f: fn(&FioMetrics) -> f64| -> Vec<f64> {
        rows.iter().map(|(_, m)| f(m)).collect()
    };

    write_metric_row(w, "Cpu Usr", "%", &collect(|m| m.cpu_usr))?;
    write_metric_row(w, "Cpu Sys", "%", &collect(|m| m.cpu_sys))?;
    write_metric_row(w, "Cpu Total", "%", &collect(|m| m.cpu_total))?;
    write_metric_row(w, "Bandwidth", "MiB/s", &collect(|m| m.bandwidth_mib))?;
    write_metric_row(w, "Iops", "ops/s", &collect(|m| m.iops))?;

    let avg_latencies: Vec<f64> = rows
        .iter()
        .filter_map(|(_, m)| m.latency.map(|l| l.avg_ms))
        .collect();
    let stdev_latencies: Vec<f64> = rows
        .iter()
        .filter_map(|(_, m)| m.latency.map(|l| l.stdev_ms))
        .collect();

    if !avg_latencies.is_empty() {
        write_metric_row(w, "Avg Latency", "ms", &avg_latencies)?;
        write_metric_row(w, "Stdev Latency", "ms", &stdev_latencies)?;

        // Min/max of latency across runs, kept as separate rows to match
        // the layout the analysis tooling consumes
        let avg_stats = MetricStats::from_values(&avg_latencies);
        writeln!(
            w,
            "Average Latency,,,ms,{:.2},{:.2}",
            avg_stats.min, avg_stats.max
        )?;
        let stdev_stats = MetricStats::from_values(&stdev_latencies);
        writeln!(
            w,
            "Standard Deviation Latency,,,ms,{:.2},{:.2}",
            stdev_stats.min, stdev_stats.max
        )?;
    }

    Ok(())
}

/// Write the summary CSV to a file
pub fn write_summary_file(path: &Path, rows: &[(u32, FioMetrics)]) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, rows)?;
    file.flush()
}

fn write_metric_row<W: Write>(w: &mut W, name: &str, unit: &str, values: &[f64]) -> io::Result<()> {
    let stats = MetricStats::from_values(values);
    if stats.is_empty() {
        return writeln!(w, "{},No data,N/A,{},N/A,N/A", name, unit);
    }
    let stddev = match stats.stddev {
        Some(s) => format!("{:.2}", s),
        None => "N/A".to_string(),
    };
    writeln!(
        w,
        "{},{:.2},{},{},{:.2},{:.2}",
        name, stats.avg, stddev, unit, stats.min, stats.max
    )
}

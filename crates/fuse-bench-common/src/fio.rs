//! fio JSON output model and derived metrics
//!
//! fio is invoked with `--output-format=json`; this module deserializes the
//! parts of that document the summary needs and derives per-iteration
//! metrics from the first job: CPU usage, combined read+write bandwidth and
//! IOPS, and completion latency normalized to milliseconds.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors from reading or interpreting fio output
#[derive(Debug, Error)]
pub enum FioParseError {
    /// Failed to read an output file
    #[error("failed to read fio output '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Output file is not valid fio JSON
    #[error("invalid fio JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document has an empty `jobs` array
    #[error("fio output contains no jobs")]
    NoJobs,

    /// No iteration output could be parsed at all
    #[error("no parseable fio outputs found in '{dir}'")]
    NoParseableOutputs { dir: String },
}

/// Top-level fio JSON document
#[derive(Debug, Deserialize)]
pub struct FioOutput {
    #[serde(default)]
    pub jobs: Vec<FioJob>,
}

/// One fio job entry
#[derive(Debug, Default, Deserialize)]
pub struct FioJob {
    #[serde(default)]
    pub usr_cpu: f64,
    #[serde(default)]
    pub sys_cpu: f64,
    #[serde(default)]
    pub read: Option<FioDirection>,
    #[serde(default)]
    pub write: Option<FioDirection>,
}

/// Per-direction (read or write) job statistics
#[derive(Debug, Default, Deserialize)]
pub struct FioDirection {
    /// Mean bandwidth in KiB/s
    #[serde(default)]
    pub bw: f64,
    #[serde(default)]
    pub iops: f64,
    #[serde(default)]
    pub lat_ns: Option<LatencyBucket>,
    #[serde(default)]
    pub lat_us: Option<LatencyBucket>,
    #[serde(default)]
    pub lat_ms: Option<LatencyBucket>,
}

/// Latency distribution summary in one of fio's native units
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct LatencyBucket {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub stddev: f64,
}

/// Latency metrics normalized to milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMetrics {
    pub avg_ms: f64,
    pub stdev_ms: f64,
}

/// Metrics derived from one iteration's fio output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FioMetrics {
    /// User CPU, percent
    pub cpu_usr: f64,
    /// System CPU, percent
    pub cpu_sys: f64,
    /// User + system CPU, percent
    pub cpu_total: f64,
    /// Combined read+write bandwidth, MiB/s
    pub bandwidth_mib: f64,
    /// Combined read+write IOPS
    pub iops: f64,
    /// Completion latency, when fio reported any
    pub latency: Option<LatencyMetrics>,
}

impl FioMetrics {
    /// Derive metrics from a parsed fio document.
    ///
    /// Only the first job is considered; the job files used here define a
    /// single job with group reporting.
    pub fn from_output(output: &FioOutput) -> Result<Self, FioParseError> {
        let job = output.jobs.first().ok_or(FioParseError::NoJobs)?;

        let cpu_usr = job.usr_cpu;
        let cpu_sys = job.sys_cpu;

        let read_bw = job.read.as_ref().map(|d| d.bw).unwrap_or(0.0);
        let write_bw = job.write.as_ref().map(|d| d.bw).unwrap_or(0.0);
        let read_iops = job.read.as_ref().map(|d| d.iops).unwrap_or(0.0);
        let write_iops = job.write.as_ref().map(|d| d.iops).unwrap_or(0.0);

        Ok(Self {
            cpu_usr,
            cpu_sys,
            cpu_total: cpu_usr + cpu_sys,
            bandwidth_mib: (read_bw + write_bw) / 1024.0,
            iops: read_iops + write_iops,
            latency: pick_latency(job),
        })
    }
}

/// Select the job's latency bucket, preferring the read direction and the
/// finest unit fio reported (ns over us over ms), normalized to ms.
fn pick_latency(job: &FioJob) -> Option<LatencyMetrics> {
    let candidates = [job.read.as_ref(), job.write.as_ref()];

    for direction in candidates.into_iter().flatten() {
        let (bucket, divisor) = if let Some(b) = direction.lat_ns {
            (b, 1_000_000.0)
        } else if let Some(b) = direction.lat_us {
            (b, 1_000.0)
        } else if let Some(b) = direction.lat_ms {
            (b, 1.0)
        } else {
            continue;
        };

        return Some(LatencyMetrics {
            avg_ms: bucket.mean / divisor,
            stdev_ms: bucket.stddev / divisor,
        });
    }

    None
}

/// Read and deserialize a fio JSON output file
pub fn parse_file(path: &Path) -> Result<FioOutput, FioParseError> {
    let json = std::fs::read_to_string(path).map_err(|source| FioParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| FioParseError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FioMetrics {
        let output: FioOutput = serde_json::from_str(json).unwrap();
        FioMetrics::from_output(&output).unwrap()
    }

    #[test]
    fn test_read_job_metrics() {
        let metrics = parse(
            r#"{
                "jobs": [{
                    "usr_cpu": 1.5,
                    "sys_cpu": 2.5,
                    "read": {
                        "bw": 2048,
                        "iops": 512.25,
                        "lat_ns": { "mean": 2000000.0, "stddev": 500000.0 }
                    }
                }]
            }"#,
        );

        assert_eq!(metrics.cpu_usr, 1.5);
        assert_eq!(metrics.cpu_sys, 2.5);
        assert_eq!(metrics.cpu_total, 4.0);
        assert_eq!(metrics.bandwidth_mib, 2.0);
        assert_eq!(metrics.iops, 512.25);
        let lat = metrics.latency.unwrap();
        assert_eq!(lat.avg_ms, 2.0);
        assert_eq!(lat.stdev_ms, 0.5);
    }

    #[test]
    fn test_combined_read_write() {
        let metrics = parse(
            r#"{
                "jobs": [{
                    "read": { "bw": 1024, "iops": 100 },
                    "write": { "bw": 3072, "iops": 50 }
                }]
            }"#,
        );

        assert_eq!(metrics.bandwidth_mib, 4.0);
        assert_eq!(metrics.iops, 150.0);
    }

    #[test]
    fn test_latency_unit_priority_prefers_ns() {
        let metrics = parse(
            r#"{
                "jobs": [{
                    "read": {
                        "lat_ns": { "mean": 1000000.0, "stddev": 0.0 },
                        "lat_us": { "mean": 9999.0, "stddev": 0.0 }
                    }
                }]
            }"#,
        );

        assert_eq!(metrics.latency.unwrap().avg_ms, 1.0);
    }

    #[test]
    fn test_latency_us_and_ms_units() {
        let metrics = parse(
            r#"{"jobs": [{"read": {"lat_us": {"mean": 1500.0, "stddev": 100.0}}}]}"#,
        );
        assert_eq!(metrics.latency.unwrap().avg_ms, 1.5);

        let metrics = parse(
            r#"{"jobs": [{"read": {"lat_ms": {"mean": 3.25, "stddev": 0.25}}}]}"#,
        );
        assert_eq!(metrics.latency.unwrap().avg_ms, 3.25);
    }

    #[test]
    fn test_write_latency_used_when_read_has_none() {
        let metrics = parse(
            r#"{
                "jobs": [{
                    "read": { "bw": 0, "iops": 0 },
                    "write": { "lat_us": { "mean": 2000.0, "stddev": 0.0 } }
                }]
            }"#,
        );

        assert_eq!(metrics.latency.unwrap().avg_ms, 2.0);
    }

    #[test]
    fn test_no_latency_reported() {
        let metrics = parse(r#"{"jobs": [{"read": {"bw": 512, "iops": 8}}]}"#);
        assert!(metrics.latency.is_none());
    }

    #[test]
    fn test_empty_jobs_is_error() {
        let output: FioOutput = serde_json::from_str(r#"{"jobs": []}"#).unwrap();
        assert!(matches!(
            FioMetrics::from_output(&output),
            Err(FioParseError::NoJobs)
        ));
    }

    #[test]
    fn test_job_without_directions() {
        let metrics = parse(r#"{"jobs": [{"usr_cpu": 0.5, "sys_cpu": 0.5}]}"#);
        assert_eq!(metrics.bandwidth_mib, 0.0);
        assert_eq!(metrics.iops, 0.0);
        assert!(metrics.latency.is_none());
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file(Path::new("/nonexistent/fio-output-1.json")).unwrap_err();
        assert!(matches!(err, FioParseError::Io { .. }));
    }

    #[test]
    fn test_parse_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fio-output-1.json");
        std::fs::write(&path, "not json").unwrap();

        let err = parse_file(&path).unwrap_err();
        assert!(matches!(err, FioParseError::Json { .. }));
    }

    #[test]
    fn test_ignores_unknown_fields() {
        // Real fio documents carry far more fields than the model
        let metrics = parse(
            r#"{
                "fio version": "fio-3.38",
                "timestamp": 1714000000,
                "jobs": [{
                    "jobname": "bench",
                    "elapsed": 30,
                    "usr_cpu": 1.0,
                    "sys_cpu": 1.0,
                    "read": { "bw": 1024, "iops": 42, "runtime": 30001, "io_bytes": 31457280 }
                }]
            }"#,
        );

        assert_eq!(metrics.bandwidth_mib, 1.0);
        assert_eq!(metrics.iops, 42.0);
    }
}

//! Benchmark iteration loop
//!
//! Runs fio once per iteration against the mounted filesystem and uploads
//! each raw JSON output as it lands. A failed iteration is recorded and
//! skipped, never fatal: with S3 behind a FUSE layer, a single flaky
//! iteration is expected and the remaining samples are still worth having.

use crate::command::{run_command_with_env, CommandConfig};
use anyhow::Result;
use fuse_bench_common::defaults::fio_output_name;
use fuse_bench_common::{BenchParams, IterationResult, RunReport};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Executes one fio iteration, writing JSON output to the given path
#[allow(async_fn_in_trait)] // Internal use only
#[cfg_attr(test, mockall::automock)]
pub trait FioInvoker: Send + Sync {
    async fn run_fio(&self, iteration: u32, output_path: &Path) -> Result<()>;
}

/// Uploads one raw iteration output, returning its object key
#[allow(async_fn_in_trait)] // Internal use only
#[cfg_attr(test, mockall::automock)]
pub trait ResultSink: Send + Sync {
    async fn upload_output(&self, iteration: u32, path: &Path) -> Result<String>;
}

/// fio invocation against the mounted filesystem
///
/// The job file is parameterized through environment variables, so one
/// artifact covers every test case.
pub struct FioCommand {
    job_file: PathBuf,
    bench_dir: PathBuf,
    params: BenchParams,
}

impl FioCommand {
    pub fn new(job_file: PathBuf, bench_dir: PathBuf, params: BenchParams) -> Self {
        Self {
            job_file,
            bench_dir,
            params,
        }
    }

    fn envs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("BLOCK_SIZE", self.params.block_size.clone()),
            ("FILE_SIZE", self.params.file_size.clone()),
            ("NRFILES", self.params.num_files.to_string()),
            ("NUMJOBS", self.params.num_file_handles.to_string()),
            ("IODEPTH", self.params.io_depth.to_string()),
            ("RW", self.params.io_kind.to_string()),
            ("BENCH_DIR", self.bench_dir.display().to_string()),
        ]
    }
}

impl FioInvoker for FioCommand {
    async fn run_fio(&self, iteration: u32, output_path: &Path) -> Result<()> {
        let output_arg = format!("--output={}", output_path.display());
        let job_file = self
            .job_file
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non-UTF8 job file path"))?;

        info!(iteration, job_file = %job_file, "Running fio");

        let ok = run_command_with_env(
            "fio",
            &["--output-format=json", &output_arg, job_file],
            &self.envs(),
            &CommandConfig::for_benchmark(),
        )
        .await?;
        if !ok {
            anyhow::bail!("fio exited with non-zero status on iteration {}", iteration);
        }
        Ok(())
    }
}

/// Run all benchmark iterations, recording each outcome.
///
/// Output files land in `results_dir` as `fio-output-{i}.json` and are
/// uploaded immediately so a crash mid-run loses at most one sample.
pub async fn run_iterations<F, S>(
    fio: &F,
    sink: &S,
    params: &BenchParams,
    results_dir: &Path,
) -> Result<RunReport>
where
    F: FioInvoker,
    S: ResultSink,
{
    std::fs::create_dir_all(results_dir)?;

    let mut report = RunReport::new(params.case_id());

    for iteration in 1..=params.iterations {
        info!(iteration, total = params.iterations, "Starting iteration");
        let output_path = results_dir.join(fio_output_name(iteration));

        let outcome = async {
            fio.run_fio(iteration, &output_path).await?;
            sink.upload_output(iteration, &output_path).await
        }
        .await;

        match outcome {
            Ok(key) => {
                info!(iteration, key = %key, "Iteration complete");
                report.record(IterationResult::success(iteration, key));
            }
            Err(e) => {
                warn!(iteration, error = %e, "Iteration failed, continuing");
                report.record(IterationResult::failure(iteration, e.to_string()));
            }
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Benchmark loop finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuse_bench_common::IoKind;

    fn params(iterations: u32) -> BenchParams {
        BenchParams {
            iterations,
            block_size: "16K".to_string(),
            file_size: "256K".to_string(),
            num_files: 4,
            num_file_handles: 2,
            io_depth: 64,
            io_kind: IoKind::RandRead,
            read_ahead_kb: 1024,
            data_bucket: "data".to_string(),
            artifacts_bucket: "artifacts".to_string(),
        }
    }

    fn permissive_sink() -> MockResultSink {
        let mut sink = MockResultSink::new();
        sink.expect_upload_output()
            .returning(|i, _| Ok(format!("case/fio-output-{}.json", i)));
        sink
    }

    #[tokio::test]
    async fn test_failed_iteration_does_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();

        let mut fio = MockFioInvoker::new();
        fio.expect_run_fio()
            .times(5)
            .returning(|iteration, _| {
                if iteration == 3 {
                    Err(anyhow::anyhow!("fio exited with non-zero status"))
                } else {
                    Ok(())
                }
            });

        let mut sink = MockResultSink::new();
        // Iteration 3 never produced an output, so only 4 uploads happen
        sink.expect_upload_output()
            .times(4)
            .withf(|iteration, _| *iteration != 3)
            .returning(|i, _| Ok(format!("case/fio-output-{}.json", i)));

        let report = run_iterations(&fio, &sink, &params(5), dir.path())
            .await
            .unwrap();

        assert_eq!(report.results.len(), 5);
        assert_eq!(report.succeeded(), 4);
        assert!(!report.results[2].success);
        assert!(report.results[2].error.as_deref().unwrap().contains("non-zero"));
        assert!(!report.is_total_failure());
    }

    #[tokio::test]
    async fn test_upload_failure_counts_as_iteration_failure() {
        let dir = tempfile::tempdir().unwrap();

        let mut fio = MockFioInvoker::new();
        fio.expect_run_fio().times(2).returning(|_, _| Ok(()));

        let mut sink = MockResultSink::new();
        sink.expect_upload_output().times(2).returning(|i, _| {
            if i == 1 {
                Err(anyhow::anyhow!("503 slow down"))
            } else {
                Ok(format!("case/fio-output-{}.json", i))
            }
        });

        let report = run_iterations(&fio, &sink, &params(2), dir.path())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_all_iterations_failing_is_a_total_failure() {
        let dir = tempfile::tempdir().unwrap();

        let mut fio = MockFioInvoker::new();
        fio.expect_run_fio()
            .times(3)
            .returning(|_, _| Err(anyhow::anyhow!("mount gone")));

        let report = run_iterations(&fio, &permissive_sink(), &params(3), dir.path())
            .await
            .unwrap();

        assert_eq!(report.failed(), 3);
        assert!(report.is_total_failure());
    }

    #[tokio::test]
    async fn test_output_paths_are_per_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("fio-output-2.json");

        let mut fio = MockFioInvoker::new();
        fio.expect_run_fio()
            .withf(move |iteration, path| *iteration != 2 || path == expected)
            .times(3)
            .returning(|_, _| Ok(()));

        run_iterations(&fio, &permissive_sink(), &params(3), dir.path())
            .await
            .unwrap();
    }

    #[test]
    fn test_fio_env_covers_all_job_knobs() {
        let cmd = FioCommand::new(
            PathBuf::from("/tmp/fio-job.fio"),
            PathBuf::from("/mnt/fuse-bench"),
            params(5),
        );
        let envs = cmd.envs();
        let get = |k: &str| {
            envs.iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("BLOCK_SIZE"), Some("16K"));
        assert_eq!(get("FILE_SIZE"), Some("256K"));
        assert_eq!(get("NRFILES"), Some("4"));
        assert_eq!(get("NUMJOBS"), Some("2"));
        assert_eq!(get("IODEPTH"), Some("64"));
        assert_eq!(get("RW"), Some("randread"));
        assert_eq!(get("BENCH_DIR"), Some("/mnt/fuse-bench"));
    }
}

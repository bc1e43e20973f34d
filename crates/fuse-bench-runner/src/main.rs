//! fuse-bench-runner: executes the benchmark on the provisioned instance
//!
//! Launched by the instance user-data. Downloads the test-case artifacts,
//! bootstraps the host (build deps, fio, s3fs), mounts the data bucket,
//! runs the fio iterations, and uploads raw outputs plus the CSV summary.
//! The `parse` subcommand re-runs just the parsing step against a local
//! results directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fuse_bench_common::defaults::{
    DEFAULT_ITERATIONS, DEFAULT_MOUNT_POINT, DEFAULT_RESULTS_DIR, JOB_FILE_KEY, MOUNT_CONFIG_KEY,
    PARAMS_KEY, RUN_REPORT_KEY, SUMMARY_KEY,
};
use fuse_bench_common::{summary, BenchParams, RunReport};
use fuse_bench_runner::bench::{run_iterations, FioCommand};
use fuse_bench_runner::{install, mount, storage::Storage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fuse-bench-runner")]
#[command(about = "On-instance agent: mounts an S3 bucket over FUSE and benchmarks it with fio")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full benchmark for one test case
    Run {
        /// S3 bucket holding the case artifacts and receiving results
        #[arg(long)]
        artifacts_bucket: String,

        /// Test-case identifier, used as the object prefix
        #[arg(long)]
        case_id: String,

        /// Where to mount the data bucket
        #[arg(long, default_value = DEFAULT_MOUNT_POINT)]
        mount_point: PathBuf,

        /// Local directory for raw iteration outputs
        #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
        results_dir: PathBuf,
    },

    /// Parse local fio outputs into the CSV summary without touching S3
    Parse {
        /// Directory holding fio-output-{i}.json files
        #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
        results_dir: PathBuf,

        /// Number of iterations to look for
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,

        /// Write the CSV here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Args::parse().command {
        Command::Run {
            artifacts_bucket,
            case_id,
            mount_point,
            results_dir,
        } => run(&artifacts_bucket, &case_id, &mount_point, &results_dir).await,
        Command::Parse {
            results_dir,
            iterations,
            output,
        } => parse(&results_dir, iterations, output.as_deref()),
    }
}

async fn run(
    artifacts_bucket: &str,
    case_id: &str,
    mount_point: &Path,
    results_dir: &Path,
) -> Result<()> {
    info!(artifacts_bucket, case_id, "Starting fuse-bench-runner");

    let storage = Storage::new(artifacts_bucket, case_id).await;

    let params_json = storage
        .download_string(PARAMS_KEY)
        .await
        .context("Failed to fetch benchmark parameters")?;
    let params = BenchParams::from_json(&params_json)?;

    if params.case_id() != case_id {
        warn!(
            expected = %params.case_id(),
            actual = %case_id,
            "Case id does not match downloaded parameters; results go under the given prefix"
        );
    }

    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create {}", results_dir.display()))?;

    install::run_bootstrap(&results_dir.join("build")).await?;

    let job_file = results_dir.join(JOB_FILE_KEY);
    storage
        .download_to_file(JOB_FILE_KEY, &job_file)
        .await
        .context("Failed to fetch fio job file")?;

    let mount_config_json = storage
        .download_string(MOUNT_CONFIG_KEY)
        .await
        .context("Failed to fetch mount config")?;
    let mount_config = mount::MountConfig::from_json(&mount_config_json)?;

    mount::mount_bucket(&params.data_bucket, mount_point, &mount_config).await?;
    mount::apply_read_ahead(mount_point, params.read_ahead_kb);

    let fio = FioCommand::new(job_file, mount_point.to_path_buf(), params.clone());
    let report = run_iterations(&fio, &storage, &params, results_dir).await?;

    // Parsing only needs the local files, so a failed unmount is not fatal
    if let Err(e) = mount::unmount(mount_point).await {
        warn!(error = %e, "Unmount failed, continuing with local results");
    }

    upload_report(&storage, &report).await?;

    if report.is_total_failure() {
        anyhow::bail!(
            "All {} iterations failed; see {} for details",
            report.results.len(),
            RUN_REPORT_KEY
        );
    }

    let rows = summary::summarize(results_dir, params.iterations)?;
    let csv_path = results_dir.join(SUMMARY_KEY);
    summary::write_summary_file(&csv_path, &rows)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    storage
        .upload_file(SUMMARY_KEY, &csv_path)
        .await
        .context("Failed to upload results summary")?;

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        summary = SUMMARY_KEY,
        "Benchmark run complete"
    );
    Ok(())
}

async fn upload_report(storage: &Storage, report: &RunReport) -> Result<()> {
    let json = serde_json::to_vec_pretty(report).context("Failed to serialize run report")?;
    storage
        .upload_bytes(RUN_REPORT_KEY, json, "application/json")
        .await
        .context("Failed to upload run report")
}

fn parse(results_dir: &Path, iterations: u32, output: Option<&Path>) -> Result<()> {
    let rows = summary::summarize(results_dir, iterations)?;
    match output {
        Some(path) => {
            summary::write_summary_file(path, &rows)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), runs = rows.len(), "Summary written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            summary::write_summary(&mut stdout, &rows)?;
        }
    }
    Ok(())
}

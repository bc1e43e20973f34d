//! fuse-bench-provisioner: launches an EC2 instance that benchmarks a
//! FUSE-mounted S3 bucket with fio
//!
//! Uploads the test-case artifacts (fio job file, mount configuration,
//! runner binary, parameters) to the artifacts bucket, then creates one
//! tagged instance whose user-data bootstraps the runner.

use anyhow::Result;
use clap::Parser;
use fuse_bench_common::defaults::{
    DEFAULT_FILE_SIZE, DEFAULT_INSTANCE_TYPE, DEFAULT_IO_DEPTH, DEFAULT_ITERATIONS,
    DEFAULT_NUM_FILES, DEFAULT_NUM_FILE_HANDLES, DEFAULT_READ_AHEAD_KB, DEFAULT_REGION,
};
use fuse_bench_common::{BenchParams, IoKind};
use fuse_bench_provisioner::aws::{AwsContext, Ec2Client, S3Client};
use fuse_bench_provisioner::config::{ArtifactPaths, InstanceConfig, ProvisionConfig};
use fuse_bench_provisioner::provision;
use garde::Validate;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fuse-bench-provisioner")]
#[command(about = "Provision an EC2 instance for a fio benchmark against a mounted S3 bucket")]
#[command(version)]
struct Args {
    /// fio block size for this test case (e.g. "16K")
    block_size: String,

    /// S3 bucket holding artifacts, raw outputs and the results summary
    #[arg(long)]
    artifacts_bucket: String,

    /// S3 bucket mounted as the benchmark target filesystem
    #[arg(long)]
    data_bucket: String,

    /// Number of benchmark iterations
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Size of each benchmark file
    #[arg(long, default_value = DEFAULT_FILE_SIZE)]
    file_size: String,

    /// Number of files the fio job spreads I/O across
    #[arg(long, default_value_t = DEFAULT_NUM_FILES)]
    num_files: u32,

    /// Number of concurrent file handles (fio numjobs)
    #[arg(long, default_value_t = DEFAULT_NUM_FILE_HANDLES)]
    num_file_handles: u32,

    /// fio I/O queue depth
    #[arg(long, default_value_t = DEFAULT_IO_DEPTH)]
    io_depth: u32,

    /// Workload kind: read, randread, write, randwrite
    #[arg(long, default_value = "read")]
    io_kind: IoKind,

    /// Kernel read-ahead applied to the mount, in KiB
    #[arg(long, default_value_t = DEFAULT_READ_AHEAD_KB)]
    read_ahead_kb: u64,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// EC2 instance type
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    instance_type: String,

    /// VPC subnet ID (uses the default VPC if not specified)
    #[arg(long)]
    subnet_id: Option<String>,

    /// Security group ID for the instance
    #[arg(long)]
    security_group_id: Option<String>,

    /// IAM instance profile granting the runner S3 access
    #[arg(long)]
    instance_profile: Option<String>,

    /// Path to the fio job description to upload
    #[arg(long, default_value = "artifacts/fio-job.fio")]
    job_file: PathBuf,

    /// Path to the mount configuration to upload
    #[arg(long, default_value = "artifacts/mount-config.json")]
    mount_config: PathBuf,

    /// Path to a pre-built runner binary
    /// (default: probed from the cargo target directory)
    #[arg(long)]
    runner_binary: Option<PathBuf>,

    /// Validate configuration and print the plan without AWS calls
    #[arg(long)]
    dry_run: bool,
}

impl From<Args> for ProvisionConfig {
    fn from(args: Args) -> Self {
        Self {
            params: BenchParams {
                iterations: args.iterations,
                block_size: args.block_size,
                file_size: args.file_size,
                num_files: args.num_files,
                num_file_handles: args.num_file_handles,
                io_depth: args.io_depth,
                io_kind: args.io_kind,
                read_ahead_kb: args.read_ahead_kb,
                data_bucket: args.data_bucket,
                artifacts_bucket: args.artifacts_bucket,
            },
            instance: InstanceConfig {
                region: args.region,
                instance_type: args.instance_type,
                subnet_id: args.subnet_id,
                security_group_id: args.security_group_id,
                iam_instance_profile: args.instance_profile,
            },
            artifacts: ArtifactPaths {
                job_file: args.job_file,
                mount_config: args.mount_config,
                runner_binary: args.runner_binary,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let dry_run = args.dry_run;
    let config: ProvisionConfig = args.into();

    config.params.validate()?;

    if dry_run {
        println!("{}", config.describe_plan());
        return Ok(());
    }

    info!(
        case_id = %config.params.case_id(),
        region = %config.instance.region,
        "Starting fuse-bench-provisioner"
    );

    let ctx = AwsContext::new(&config.instance.region).await;
    let ec2 = Ec2Client::from_context(&ctx);
    let s3 = S3Client::from_context(&ctx);

    let instance = provision::provision(&ec2, &s3, &config).await?;

    println!(
        "Launched {} ({}) for case {}",
        instance.instance_id,
        instance.public_ip.as_deref().unwrap_or("no public IP"),
        config.params.case_id()
    );

    Ok(())
}

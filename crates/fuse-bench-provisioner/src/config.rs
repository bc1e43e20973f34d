//! Configuration types for the provisioner

use fuse_bench_common::BenchParams;
use std::path::PathBuf;

/// EC2 placement and instance settings
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// AWS region
    pub region: String,
    /// EC2 instance type
    pub instance_type: String,
    /// VPC subnet ID (uses the default VPC if not specified)
    pub subnet_id: Option<String>,
    /// Security group ID
    pub security_group_id: Option<String>,
    /// IAM instance profile name granting the runner S3 access
    pub iam_instance_profile: Option<String>,
}

/// Local paths of the artifacts to upload
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// fio job description file
    pub job_file: PathBuf,
    /// Mount configuration JSON
    pub mount_config: PathBuf,
    /// Runner binary; probed from the target directory when absent
    pub runner_binary: Option<PathBuf>,
}

/// Full provisioning configuration for one test case
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Benchmark parameters forwarded to the runner
    pub params: BenchParams,
    pub instance: InstanceConfig,
    pub artifacts: ArtifactPaths,
}

impl ProvisionConfig {
    /// Human-readable plan, printed for dry runs
    pub fn describe_plan(&self) -> String {
        let case_id = self.params.case_id();
        format!(
            "case id: {case_id}\n\
             region: {region}\n\
             instance type: {itype}\n\
             artifacts bucket: {artifacts}\n\
             data bucket: {data}\n\
             iterations: {iters}\n\
             upload prefix: s3://{artifacts}/{case_id}/",
            region = self.instance.region,
            itype = self.instance.instance_type,
            artifacts = self.params.artifacts_bucket,
            data = self.params.data_bucket,
            iters = self.params.iterations,
        )
    }
}

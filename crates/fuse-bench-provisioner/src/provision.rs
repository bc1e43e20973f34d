//! Single-pass provisioning orchestration
//!
//! Upload artifacts, render user-data, launch exactly one instance, wait
//! until it is running. Strictly sequential; the first error aborts.

use crate::artifacts::upload_artifacts;
use crate::aws::ec2::{LaunchSpec, LaunchedInstance, ProvisionEc2};
use crate::aws::s3::ArtifactStore;
use crate::config::ProvisionConfig;
use crate::user_data::generate_user_data;
use anyhow::Result;
use tracing::info;
use uuid::Uuid;

/// Provision the benchmark instance for the configured test case
pub async fn provision<E, S>(
    ec2: &E,
    store: &S,
    config: &ProvisionConfig,
) -> Result<LaunchedInstance>
where
    E: ProvisionEc2,
    S: ArtifactStore,
{
    let case_id = config.params.case_id();
    let run_id = Uuid::now_v7().to_string();

    info!(case_id = %case_id, run_id = %run_id, "Provisioning benchmark instance");

    // Artifacts must be in place before the instance boots and fetches them
    upload_artifacts(store, &config.params, &config.artifacts).await?;

    let user_data = generate_user_data(&config.params.artifacts_bucket, &case_id);

    let instance = ec2
        .launch_instance(LaunchSpec {
            run_id,
            case_id: case_id.clone(),
            instance_type: config.instance.instance_type.clone(),
            user_data,
            subnet_id: config.instance.subnet_id.clone(),
            security_group_id: config.instance.security_group_id.clone(),
            iam_instance_profile: config.instance.iam_instance_profile.clone(),
        })
        .await?;

    let public_ip = ec2.wait_for_running(&instance.instance_id, None).await?;

    info!(
        instance_id = %instance.instance_id,
        public_ip = ?public_ip,
        case_id = %case_id,
        "Benchmark instance is running"
    );

    Ok(LaunchedInstance {
        instance_id: instance.instance_id,
        public_ip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::MockProvisionEc2;
    use crate::aws::s3::MockArtifactStore;
    use crate::config::{ArtifactPaths, InstanceConfig};
    use fuse_bench_common::{BenchParams, IoKind};
    use std::path::Path;

    fn config(dir: &Path) -> ProvisionConfig {
        let job_file = dir.join("fio-job.fio");
        let mount_config = dir.join("mount-config.json");
        let runner = dir.join("runner");
        std::fs::write(&job_file, "[global]\n").unwrap();
        std::fs::write(&mount_config, "{}").unwrap();
        std::fs::write(&runner, b"\x7fELF").unwrap();

        ProvisionConfig {
            params: BenchParams {
                iterations: 5,
                block_size: "16K".to_string(),
                file_size: "256K".to_string(),
                num_files: 4,
                num_file_handles: 2,
                io_depth: 64,
                io_kind: IoKind::RandRead,
                read_ahead_kb: 1024,
                data_bucket: "data".to_string(),
                artifacts_bucket: "artifacts".to_string(),
            },
            instance: InstanceConfig {
                region: "us-east-2".to_string(),
                instance_type: "c7i.2xlarge".to_string(),
                subnet_id: None,
                security_group_id: Some("sg-123".to_string()),
                iam_instance_profile: Some("fuse-bench-runner".to_string()),
            },
            artifacts: ArtifactPaths {
                job_file,
                mount_config,
                runner_binary: Some(runner),
            },
        }
    }

    fn permissive_store() -> MockArtifactStore {
        let mut store = MockArtifactStore::new();
        store.expect_upload_file().returning(|_, _, _| Ok(()));
        store.expect_upload_bytes().returning(|_, _, _, _| Ok(()));
        store
    }

    #[tokio::test]
    async fn test_launches_exactly_one_instance_with_case_tags() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let case_id = cfg.params.case_id();

        let mut ec2 = MockProvisionEc2::new();
        ec2.expect_launch_instance()
            .withf(move |spec| {
                spec.case_id == case_id
                    && spec.instance_type == "c7i.2xlarge"
                    && spec.iam_instance_profile.as_deref() == Some("fuse-bench-runner")
                    && spec.user_data.contains("--case-id")
            })
            .once()
            .returning(|_| {
                Ok(LaunchedInstance {
                    instance_id: "i-0abc".to_string(),
                    public_ip: None,
                })
            });
        ec2.expect_wait_for_running()
            .withf(|id, _| id == "i-0abc")
            .once()
            .returning(|_, _| Ok(Some("1.2.3.4".to_string())));

        let launched = provision(&ec2, &permissive_store(), &cfg).await.unwrap();
        assert_eq!(launched.instance_id, "i-0abc");
        assert_eq!(launched.public_ip.as_deref(), Some("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_upload_failure_prevents_launch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let mut store = MockArtifactStore::new();
        store
            .expect_upload_file()
            .returning(|_, _, _| Err(anyhow::anyhow!("no such bucket")));

        let mut ec2 = MockProvisionEc2::new();
        ec2.expect_launch_instance().never();
        ec2.expect_wait_for_running().never();

        assert!(provision(&ec2, &store, &cfg).await.is_err());
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal_and_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let mut ec2 = MockProvisionEc2::new();
        ec2.expect_launch_instance()
            .once()
            .returning(|_| Err(anyhow::anyhow!("InsufficientInstanceCapacity")));
        ec2.expect_wait_for_running().never();

        let err = provision(&ec2, &permissive_store(), &cfg)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("InsufficientInstanceCapacity"));
    }
}

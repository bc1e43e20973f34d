//! Artifact uploads for one test case
//!
//! Before the instance is created, three static artifacts go up under the
//! case prefix: the fio job description, the mount configuration, and the
//! runner binary (which doubles as the result parser). The serialized
//! benchmark parameters ride along as a fourth object.

use crate::aws::s3::ArtifactStore;
use crate::config::ArtifactPaths;
use anyhow::{Context, Result};
use fuse_bench_common::defaults::{
    JOB_FILE_KEY, MOUNT_CONFIG_KEY, PARAMS_KEY, RUNNER_BINARY_KEY,
};
use fuse_bench_common::BenchParams;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upload the job file, mount config, runner binary and params JSON to the
/// artifacts bucket under `{case_id}/`. Any failure aborts provisioning.
pub async fn upload_artifacts<S: ArtifactStore>(
    store: &S,
    params: &BenchParams,
    paths: &ArtifactPaths,
) -> Result<()> {
    let bucket = &params.artifacts_bucket;
    let case_id = params.case_id();

    let runner = match &paths.runner_binary {
        Some(path) => path.clone(),
        None => find_runner_binary()
            .context("Runner binary not found; build it or pass --runner-binary")?,
    };

    info!(bucket = %bucket, case_id = %case_id, "Uploading artifacts");

    store
        .upload_file(bucket, &format!("{}/{}", case_id, JOB_FILE_KEY), &paths.job_file)
        .await
        .context("Failed to upload fio job file")?;

    store
        .upload_file(
            bucket,
            &format!("{}/{}", case_id, MOUNT_CONFIG_KEY),
            &paths.mount_config,
        )
        .await
        .context("Failed to upload mount config")?;

    store
        .upload_file(bucket, &format!("{}/{}", case_id, RUNNER_BINARY_KEY), &runner)
        .await
        .context("Failed to upload runner binary")?;

    let params_json = params.to_json()?;
    store
        .upload_bytes(
            bucket,
            &format!("{}/{}", case_id, PARAMS_KEY),
            params_json.into_bytes(),
            "application/json",
        )
        .await
        .context("Failed to upload params")?;

    info!(bucket = %bucket, case_id = %case_id, "Artifacts uploaded");

    Ok(())
}

/// Try to find the runner binary in common build locations.
/// Prefers musl (statically linked) over gnu (dynamically linked).
pub fn find_runner_binary() -> Option<PathBuf> {
    let candidates = [
        // Cross-compiled release builds (cargo build --target)
        "target/x86_64-unknown-linux-musl/release/fuse-bench-runner",
        "../target/x86_64-unknown-linux-musl/release/fuse-bench-runner",
        "target/x86_64-unknown-linux-gnu/release/fuse-bench-runner",
        "../target/x86_64-unknown-linux-gnu/release/fuse-bench-runner",
        // Native release build
        "target/release/fuse-bench-runner",
        "../target/release/fuse-bench-runner",
    ];

    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            return p.canonicalize().ok();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::s3::MockArtifactStore;
    use fuse_bench_common::IoKind;
    use std::io::Write;

    fn params() -> BenchParams {
        BenchParams {
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
        }
    }

    fn artifact_paths(dir: &Path) -> ArtifactPaths {
        let job_file = dir.join("fio-job.fio");
        let mount_config = dir.join("mount-config.json");
        let runner = dir.join("runner");
        std::fs::File::create(&job_file)
            .unwrap()
            .write_all(b"[global]\n")
            .unwrap();
        std::fs::write(&mount_config, "{}").unwrap();
        std::fs::write(&runner, b"\x7fELF").unwrap();
        ArtifactPaths {
            job_file,
            mount_config,
            runner_binary: Some(runner),
        }
    }

    #[tokio::test]
    async fn test_uploads_all_artifacts_under_case_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let paths = artifact_paths(dir.path());
        let params = params();
        let prefix = params.case_id();

        let mut store = MockArtifactStore::new();
        for key in [JOB_FILE_KEY, MOUNT_CONFIG_KEY, RUNNER_BINARY_KEY] {
            let expected = format!("{}/{}", prefix, key);
            store
                .expect_upload_file()
                .withf(move |bucket, k, _| bucket == "artifacts" && k == expected)
                .once()
                .returning(|_, _, _| Ok(()));
        }
        let expected_params_key = format!("{}/{}", prefix, PARAMS_KEY);
        store
            .expect_upload_bytes()
            .withf(move |bucket, k, data, content_type| {
                bucket == "artifacts"
                    && k == expected_params_key
                    && content_type == "application/json"
                    && serde_json::from_slice::<serde_json::Value>(data).is_ok()
            })
            .once()
            .returning(|_, _, _, _| Ok(()));

        upload_artifacts(&store, &params, &paths).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = artifact_paths(dir.path());

        let mut store = MockArtifactStore::new();
        store
            .expect_upload_file()
            .returning(|_, _, _| Err(anyhow::anyhow!("access denied")));

        let err = upload_artifacts(&store, &params(), &paths)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fio job file"));
    }

    #[tokio::test]
    async fn test_missing_runner_binary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = artifact_paths(dir.path());
        paths.runner_binary = None;

        // Only meaningful when no real build artifact is lying around
        if find_runner_binary().is_some() {
            return;
        }

        let store = MockArtifactStore::new();
        let err = upload_artifacts(&store, &params(), &paths)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Runner binary not found"));
    }
}

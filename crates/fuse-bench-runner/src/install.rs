//! Host bootstrap: build dependencies, fio and s3fs
//!
//! The AMI ships neither fio nor s3fs, and the distro packages lag too far
//! behind to benchmark against, so both are built from pinned upstream
//! tags. Package installation is the one phase that talks to external
//! repositories at boot, so it gets a bounded fixed-delay retry; the
//! source builds are deterministic and fail fast.

use crate::command::{run_command, run_command_in, CommandConfig};
use anyhow::{Context, Result};
use fuse_bench_common::defaults::{DEFAULT_INSTALL_MAX_ATTEMPTS, DEFAULT_INSTALL_RETRY_DELAY_SECS};
use fuse_bench_common::retry::{retry, RetryPolicy};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Packages required to build fio and s3fs from source on AL2023
const BUILD_DEPS: &[&str] = &[
    "gcc",
    "gcc-c++",
    "make",
    "git",
    "automake",
    "autoconf",
    "libtool",
    "fuse",
    "fuse-devel",
    "libcurl-devel",
    "libxml2-devel",
    "openssl-devel",
    "libaio-devel",
    "zlib-devel",
];

const FIO_REPO: &str = "https://github.com/axboe/fio.git";
const FIO_TAG: &str = "fio-3.38";
const FIO_BINARY: &str = "/usr/local/bin/fio";

const S3FS_REPO: &str = "https://github.com/s3fs-fuse/s3fs-fuse.git";
const S3FS_TAG: &str = "v1.95";
const S3FS_BINARY: &str = "/usr/local/bin/s3fs";

/// Default retry policy for package installation
pub fn install_retry_policy() -> RetryPolicy {
    RetryPolicy::new(
        DEFAULT_INSTALL_MAX_ATTEMPTS,
        Duration::from_secs(DEFAULT_INSTALL_RETRY_DELAY_SECS),
    )
}

/// Install the build dependencies via dnf, retrying transient failures
pub async fn install_build_deps(policy: &RetryPolicy) -> Result<()> {
    info!(packages = BUILD_DEPS.len(), "Installing build dependencies");

    retry(policy, "dnf install", || async {
        let mut args = vec!["install", "-y"];
        args.extend_from_slice(BUILD_DEPS);
        let ok = run_command("dnf", &args, &CommandConfig::for_install()).await?;
        if !ok {
            anyhow::bail!("dnf install exited with non-zero status");
        }
        Ok(())
    })
    .await
    .context("Failed to install build dependencies")
}

/// Build and install fio from its pinned upstream tag
pub async fn build_fio(workdir: &Path) -> Result<()> {
    if Path::new(FIO_BINARY).exists() {
        info!(binary = FIO_BINARY, "fio already installed, skipping build");
        return Ok(());
    }

    let src = workdir.join("fio");
    clone_pinned(FIO_REPO, FIO_TAG, &src).await?;

    for (cmd, args) in [
        ("./configure", vec![]),
        ("make", vec!["-j"]),
        ("make", vec!["install"]),
    ] {
        let ok = run_command_in(cmd, &args, &src, &CommandConfig::for_build()).await?;
        if !ok {
            anyhow::bail!("fio build step '{}' failed", cmd);
        }
    }

    info!(tag = FIO_TAG, "fio built and installed");
    Ok(())
}

/// Build and install s3fs from its pinned upstream tag
pub async fn build_s3fs(workdir: &Path) -> Result<()> {
    if Path::new(S3FS_BINARY).exists() {
        info!(binary = S3FS_BINARY, "s3fs already installed, skipping build");
        return Ok(());
    }

    let src = workdir.join("s3fs-fuse");
    clone_pinned(S3FS_REPO, S3FS_TAG, &src).await?;

    for (cmd, args) in [
        ("./autogen.sh", vec![]),
        ("./configure", vec![]),
        ("make", vec!["-j"]),
        ("make", vec!["install"]),
    ] {
        let ok = run_command_in(cmd, &args, &src, &CommandConfig::for_build()).await?;
        if !ok {
            anyhow::bail!("s3fs build step '{}' failed", cmd);
        }
    }

    info!(tag = S3FS_TAG, "s3fs built and installed");
    Ok(())
}

async fn clone_pinned(repo: &str, tag: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        info!(dest = %dest.display(), "Source checkout already present, reusing");
        return Ok(());
    }

    let dest_str = dest
        .to_str()
        .with_context(|| format!("Non-UTF8 checkout path: {}", dest.display()))?;

    let ok = run_command(
        "git",
        &["clone", "--depth", "1", "--branch", tag, repo, dest_str],
        &CommandConfig::for_install(),
    )
    .await?;
    if !ok {
        anyhow::bail!("git clone of {} ({}) failed", repo, tag);
    }
    Ok(())
}

/// Full bootstrap sequence: packages, then both tools
pub async fn run_bootstrap(workdir: &Path) -> Result<()> {
    info!("=== Starting bootstrap ===");

    std::fs::create_dir_all(workdir)
        .with_context(|| format!("Failed to create workdir {}", workdir.display()))?;

    install_build_deps(&install_retry_policy()).await?;
    build_fio(workdir).await?;
    build_s3fs(workdir).await?;

    info!("=== Bootstrap complete ===");
    Ok(())
}

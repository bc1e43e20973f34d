//! FUSE mount management for the data bucket
//!
//! Mounts the data bucket with s3fs using the instance role for
//! credentials, verifies the mount landed in /proc/mounts, and applies
//! the configured kernel read-ahead to the FUSE backing device.

use crate::command::{run_command, CommandConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tracing::{info, warn};

/// Mount tuning options, shipped as one of the provisioned artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// s3fs stat cache expiry in seconds
    pub stat_cache_expire_secs: Option<u64>,
    /// Use path-style requests (needed for some S3-compatible endpoints)
    pub use_path_request_style: bool,
    /// Extra raw `-o` options appended verbatim
    pub extra_options: Vec<String>,
}

impl MountConfig {
    /// Parse a mount configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse mount config JSON")
    }
}

/// Build the s3fs argument list for mounting `bucket` at `mount_point`
fn mount_args(bucket: &str, mount_point: &str, config: &MountConfig) -> Vec<String> {
    let mut args = vec![
        bucket.to_string(),
        mount_point.to_string(),
        "-o".to_string(),
        "iam_role=auto".to_string(),
        "-o".to_string(),
        "allow_other".to_string(),
    ];
    if let Some(secs) = config.stat_cache_expire_secs {
        args.push("-o".to_string());
        args.push(format!("stat_cache_expire={}", secs));
    }
    if config.use_path_request_style {
        args.push("-o".to_string());
        args.push("use_path_request_style".to_string());
    }
    for opt in &config.extra_options {
        args.push("-o".to_string());
        args.push(opt.clone());
    }
    args
}

/// Mount the data bucket at `mount_point` and verify it is live
pub async fn mount_bucket(bucket: &str, mount_point: &Path, config: &MountConfig) -> Result<()> {
    std::fs::create_dir_all(mount_point)
        .with_context(|| format!("Failed to create mount point {}", mount_point.display()))?;

    let mount_point_str = mount_point
        .to_str()
        .with_context(|| format!("Non-UTF8 mount point: {}", mount_point.display()))?;

    info!(bucket = %bucket, mount_point = %mount_point_str, "Mounting bucket with s3fs");

    let args = mount_args(bucket, mount_point_str, config);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let ok = run_command("s3fs", &arg_refs, &CommandConfig::with_timeout_secs(120)).await?;
    if !ok {
        anyhow::bail!("s3fs exited with non-zero status mounting {}", bucket);
    }

    if !is_mounted(mount_point_str)? {
        anyhow::bail!("{} is not present in /proc/mounts after s3fs", mount_point_str);
    }

    info!(mount_point = %mount_point_str, "Mount verified");
    Ok(())
}

/// Check /proc/mounts for a fuse.s3fs entry at `mount_point`
fn is_mounted(mount_point: &str) -> Result<bool> {
    let mounts = std::fs::read_to_string("/proc/mounts").context("Failed to read /proc/mounts")?;
    Ok(mounts.lines().any(|line| {
        let mut fields = line.split_whitespace();
        let _device = fields.next();
        fields.next() == Some(mount_point) && fields.next().is_some_and(|t| t.starts_with("fuse"))
    }))
}

/// Unmount the bucket, falling back to plain umount if fusermount fails
pub async fn unmount(mount_point: &Path) -> Result<()> {
    let mount_point_str = mount_point
        .to_str()
        .with_context(|| format!("Non-UTF8 mount point: {}", mount_point.display()))?;

    info!(mount_point = %mount_point_str, "Unmounting");

    let ok = run_command(
        "fusermount",
        &["-u", mount_point_str],
        &CommandConfig::with_timeout_secs(60),
    )
    .await
    .unwrap_or(false);
    if ok {
        return Ok(());
    }

    warn!(mount_point = %mount_point_str, "fusermount failed, trying umount");
    let ok = run_command(
        "umount",
        &[mount_point_str],
        &CommandConfig::with_timeout_secs(60),
    )
    .await?;
    if !ok {
        anyhow::bail!("Failed to unmount {}", mount_point_str);
    }
    Ok(())
}

/// Compute the `major:minor` BDI identifier for a device number.
///
/// Matches the kernel's encoding: major is bits 8-19, minor is bits 0-7
/// plus bits 20+ shifted down.
fn bdi_id(dev: u64) -> String {
    let major = (dev >> 8) & 0xfff;
    let minor = (dev & 0xff) | ((dev >> 12) & 0xfff00);
    format!("{}:{}", major, minor)
}

/// Apply the kernel read-ahead setting to the mount's backing device.
///
/// Failure is logged, not fatal: the benchmark still runs, just with the
/// default read-ahead.
pub fn apply_read_ahead(mount_point: &Path, read_ahead_kb: u64) {
    let result = (|| -> Result<()> {
        let meta = std::fs::metadata(mount_point)
            .with_context(|| format!("Failed to stat {}", mount_point.display()))?;
        let bdi_path = format!("/sys/class/bdi/{}/read_ahead_kb", bdi_id(meta.dev()));
        std::fs::write(&bdi_path, read_ahead_kb.to_string())
            .with_context(|| format!("Failed to write {}", bdi_path))?;
        info!(bdi = %bdi_path, read_ahead_kb, "Applied read-ahead");
        Ok(())
    })();

    if let Err(e) = result {
        warn!(error = %e, read_ahead_kb, "Could not apply read-ahead, continuing");
    }
}

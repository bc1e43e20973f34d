//! fuse-bench-provisioner library
//!
//! Uploads the benchmark artifacts to S3 and launches a single EC2 instance
//! whose user-data bootstraps the runner.

pub mod artifacts;
pub mod aws;
pub mod config;
pub mod provision;
pub mod user_data;

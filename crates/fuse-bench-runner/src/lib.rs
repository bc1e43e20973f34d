//! On-instance benchmark runner
//!
//! Runs on the provisioned EC2 instance: installs build dependencies,
//! builds fio and s3fs from source, mounts the data bucket over FUSE,
//! executes the fio iterations, and uploads raw outputs plus a CSV
//! summary back to the artifacts bucket.

pub mod bench;
pub mod command;
pub mod install;
pub mod mount;
pub mod storage;

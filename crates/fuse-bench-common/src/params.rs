//! Benchmark parameter set shared between the provisioner and the runner
//!
//! The provisioner serializes `BenchParams` to JSON and uploads it to the
//! artifacts bucket under the test-case prefix. The runner downloads and
//! deserializes it to configure the benchmark run. Validation is done via
//! `garde::Validate` and applied on every load path.

use crate::defaults::{
    default_file_size, default_io_depth, default_iterations, default_num_file_handles,
    default_num_files, default_read_ahead_kb,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors from loading or validating benchmark parameters
#[derive(Debug, Error)]
pub enum ParamsError {
    /// Failed to parse JSON parameters
    #[error("failed to parse params: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parameters failed validation
    #[error("invalid params: {0}")]
    Invalid(#[from] garde::Report),

    /// Failed to read a parameters file
    #[error("failed to read params file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Unrecognized I/O kind string
    #[error("unknown I/O kind '{0}', expected read/randread/write/randwrite")]
    UnknownIoKind(String),
}

/// fio workload kind, rendered as the fio `rw=` value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoKind {
    #[default]
    Read,
    RandRead,
    Write,
    RandWrite,
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoKind::Read => write!(f, "read"),
            IoKind::RandRead => write!(f, "randread"),
            IoKind::Write => write!(f, "write"),
            IoKind::RandWrite => write!(f, "randwrite"),
        }
    }
}

impl FromStr for IoKind {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(IoKind::Read),
            "randread" => Ok(IoKind::RandRead),
            "write" => Ok(IoKind::Write),
            "randwrite" => Ok(IoKind::RandWrite),
            other => Err(ParamsError::UnknownIoKind(other.to_string())),
        }
    }
}

/// Benchmark parameters for one test case
///
/// Every field the runner needs to execute its iterations is here. The
/// derived test-case identifier doubles as the storage path prefix, so the
/// size strings are constrained to a shape that can never introduce a `/`
/// or collide across the identifier's segments.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BenchParams {
    /// Number of benchmark iterations
    #[serde(default = "default_iterations")]
    #[garde(range(min = 1))]
    pub iterations: u32,

    /// fio block size (e.g. "16K")
    #[garde(pattern(r"^[0-9]+[kKmMgG]?$"))]
    pub block_size: String,

    /// Size of each benchmark file (e.g. "256K")
    #[serde(default = "default_file_size")]
    #[garde(pattern(r"^[0-9]+[kKmMgG]?$"))]
    pub file_size: String,

    /// Number of files the fio job spreads I/O across
    #[serde(default = "default_num_files")]
    #[garde(range(min = 1))]
    pub num_files: u32,

    /// Number of concurrent file handles (fio numjobs)
    #[serde(default = "default_num_file_handles")]
    #[garde(range(min = 1))]
    pub num_file_handles: u32,

    /// fio I/O queue depth
    #[serde(default = "default_io_depth")]
    #[garde(range(min = 1))]
    pub io_depth: u32,

    /// Workload kind
    #[serde(default)]
    #[garde(skip)]
    pub io_kind: IoKind,

    /// Kernel read-ahead applied to the mount, in KiB
    #[serde(default = "default_read_ahead_kb")]
    #[garde(skip)]
    pub read_ahead_kb: u64,

    /// Bucket mounted as the benchmark target filesystem
    #[garde(length(min = 1), pattern(r"^[^/]+$"))]
    pub data_bucket: String,

    /// Bucket holding artifacts, raw outputs and the results summary
    #[garde(length(min = 1), pattern(r"^[^/]+$"))]
    pub artifacts_bucket: String,
}

impl BenchParams {
    /// Derived test-case identifier, used as the storage path prefix.
    ///
    /// Deterministic and injective over (num_files, io_kind, file_size,
    /// block_size, num_file_handles): the segments are underscore-separated
    /// and each component is either numeric or matches `[0-9]+[kKmMgG]?`,
    /// so no two parameter combinations render the same string. Contains
    /// no `/`.
    pub fn case_id(&self) -> String {
        format!(
            "{}files_{}_{}fs_{}bs_{}fh",
            self.num_files, self.io_kind, self.file_size, self.block_size, self.num_file_handles
        )
    }

    /// Parse parameters from a JSON string and validate them
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a JSON file and validate them
    pub fn from_file(path: &Path) -> Result<Self, ParamsError> {
        let json = std::fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serialize parameters to pretty JSON
    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

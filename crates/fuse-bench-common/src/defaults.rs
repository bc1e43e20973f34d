//! Default configuration values shared between the provisioner and the runner
//!
//! These constants keep the two binaries agreeing on parameter defaults and
//! on the object keys used under a test-case prefix.

/// Default number of benchmark iterations per run
pub const DEFAULT_ITERATIONS: u32 = 5;

/// Default size of each benchmark file (fio size string)
pub const DEFAULT_FILE_SIZE: &str = "256K";

/// Default number of files touched by a fio job
pub const DEFAULT_NUM_FILES: u32 = 4;

/// Default number of concurrent file handles (fio numjobs)
pub const DEFAULT_NUM_FILE_HANDLES: u32 = 1;

/// Default fio I/O queue depth
pub const DEFAULT_IO_DEPTH: u32 = 64;

/// Default kernel read-ahead applied to the FUSE mount, in KiB
pub const DEFAULT_READ_AHEAD_KB: u64 = 1024;

/// Default maximum attempts for the package-installation retry
pub const DEFAULT_INSTALL_MAX_ATTEMPTS: u32 = 3;

/// Default delay between package-installation attempts, in seconds
pub const DEFAULT_INSTALL_RETRY_DELAY_SECS: u64 = 10;

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-2";

/// Default EC2 instance type for benchmark instances
pub const DEFAULT_INSTANCE_TYPE: &str = "c7i.2xlarge";

/// Default mount point for the bucket filesystem on the instance
pub const DEFAULT_MOUNT_POINT: &str = "/mnt/fuse-bench";

/// Default working directory for raw iteration outputs on the instance
pub const DEFAULT_RESULTS_DIR: &str = "/var/tmp/fuse-bench";

// Object keys under the `{case_id}/` prefix in the artifacts bucket.

/// Key of the fio job description artifact
pub const JOB_FILE_KEY: &str = "fio-job.fio";

/// Key of the mount configuration artifact
pub const MOUNT_CONFIG_KEY: &str = "mount-config.json";

/// Key of the runner binary artifact (also serves as the result parser)
pub const RUNNER_BINARY_KEY: &str = "runner";

/// Key of the serialized benchmark parameters
pub const PARAMS_KEY: &str = "params.json";

/// Key of the CSV results summary
pub const SUMMARY_KEY: &str = "fio_results.csv";

/// Key of the per-iteration run report
pub const RUN_REPORT_KEY: &str = "run-report.json";

/// Name of a raw fio output object for one iteration
pub fn fio_output_name(iteration: u32) -> String {
    format!("fio-output-{}.json", iteration)
}

// Serde default functions for struct field defaults

/// Returns the default iteration count
pub fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Returns the default file size
pub fn default_file_size() -> String {
    DEFAULT_FILE_SIZE.to_string()
}

/// Returns the default file count
pub fn default_num_files() -> u32 {
    DEFAULT_NUM_FILES
}

/// Returns the default file-handle count
pub fn default_num_file_handles() -> u32 {
    DEFAULT_NUM_FILE_HANDLES
}

/// Returns the default I/O depth
pub fn default_io_depth() -> u32 {
    DEFAULT_IO_DEPTH
}

/// Returns the default read-ahead in KiB
pub fn default_read_ahead_kb() -> u64 {
    DEFAULT_READ_AHEAD_KB
}

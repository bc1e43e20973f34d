//! User-data generation for the benchmark instance
//!
//! The instance bootstrap is intentionally tiny: fetch the runner binary
//! from the artifacts bucket and exec it. Everything else (toolchain
//! install, mounting, the benchmark loop) happens inside the runner, where
//! failures are logged and reported properly.

/// Validate that a user-data input is safe for shell interpolation.
///
/// Rejects characters that could break double-quoted bash strings
/// or enable injection (`"`, `\`, `` ` ``, `$`, newlines).
fn validate_shell_input(value: &str, field_name: &str) -> Result<(), String> {
    const FORBIDDEN: &[char] = &['"', '\\', '`', '$', '\n', '\r'];
    if let Some(bad) = value.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(format!("{field_name} contains forbidden character: {bad:?}"));
    }
    if value.is_empty() {
        return Err(format!("{field_name} cannot be empty"));
    }
    Ok(())
}

/// Generate the user-data script for the benchmark instance.
///
/// # Panics
/// Panics if any input contains characters unsafe for shell interpolation.
pub fn generate_user_data(artifacts_bucket: &str, case_id: &str) -> String {
    validate_shell_input(artifacts_bucket, "artifacts_bucket")
        .expect("invalid artifacts bucket for user data");
    validate_shell_input(case_id, "case_id").expect("invalid case_id for user data");
    format!(
        r#"#!/bin/bash
set -euo pipefail

exec > >(tee /var/log/fuse-bench-bootstrap.log) 2>&1

ARTIFACTS_BUCKET="{artifacts_bucket}"
CASE_ID="{case_id}"

# Download and run the benchmark runner (it handles all setup internally)
echo "Fetching runner from S3..."
aws s3 cp "s3://${{ARTIFACTS_BUCKET}}/${{CASE_ID}}/runner" /usr/local/bin/fuse-bench-runner
chmod +x /usr/local/bin/fuse-bench-runner

echo "Starting fuse-bench-runner..."
exec /usr/local/bin/fuse-bench-runner run \
    --artifacts-bucket "$ARTIFACTS_BUCKET" \
    --case-id "$CASE_ID"
"#,
        artifacts_bucket = artifacts_bucket,
        case_id = case_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_user_data_contains_required_elements() {
        let script = generate_user_data("my-artifacts", "4files_randread_256Kfs_16Kbs_2fh");

        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("set -euo pipefail"));

        assert!(script.contains("ARTIFACTS_BUCKET=\"my-artifacts\""));
        assert!(script.contains("CASE_ID=\"4files_randread_256Kfs_16Kbs_2fh\""));

        // Runner download from the case prefix
        assert!(script.contains("aws s3 cp"));
        assert!(script.contains("s3://${ARTIFACTS_BUCKET}/${CASE_ID}/runner"));

        // Runner execution with CLI args
        assert!(script.contains("exec /usr/local/bin/fuse-bench-runner run"));
        assert!(script.contains("--artifacts-bucket"));
        assert!(script.contains("--case-id"));
    }

    #[test]
    #[should_panic(expected = "invalid artifacts bucket")]
    fn test_generate_user_data_rejects_shell_injection() {
        generate_user_data("bucket\"; rm -rf /; echo \"", "case-1");
    }

    #[test]
    #[should_panic(expected = "invalid case_id")]
    fn test_generate_user_data_rejects_dollar_sign() {
        generate_user_data("bucket", "$(whoami)");
    }

    #[test]
    fn test_validate_shell_input_accepts_valid_inputs() {
        assert!(validate_shell_input("fuse-bench-artifacts", "test").is_ok());
        assert!(validate_shell_input("4files_randread_256Kfs_16Kbs_2fh", "test").is_ok());
    }

    #[test]
    fn test_validate_shell_input_rejects_empty() {
        assert!(validate_shell_input("", "test").is_err());
    }

    #[test]
    fn test_validate_shell_input_rejects_newline() {
        assert!(validate_shell_input("bucket\nrm -rf /", "test").is_err());
    }
}

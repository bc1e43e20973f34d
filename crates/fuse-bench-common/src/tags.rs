//! AWS resource tag constants for fuse-bench
//!
//! Benchmark instances are tagged with these standard tags so runs can be
//! found (and stray instances cleaned up by hand) after the fact.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `fuse-bench:tool` | Static identifier ("fuse-bench") |
//! | `fuse-bench:run-id` | Unique run identifier (UUID) |
//! | `fuse-bench:case-id` | Derived test-case identifier |
//! | `fuse-bench:created-at` | RFC 3339 creation timestamp |

/// Tag key for tool identification - all fuse-bench resources have this
pub const TAG_TOOL: &str = "fuse-bench:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "fuse-bench";

/// Tag key for run ID - unique identifier per provisioned instance
pub const TAG_RUN_ID: &str = "fuse-bench:run-id";

/// Tag key for the derived test-case identifier
pub const TAG_CASE_ID: &str = "fuse-bench:case-id";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "fuse-bench:created-at";

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Helper to parse creation timestamp from tags
pub fn parse_created_at(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

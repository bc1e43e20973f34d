//! Per-iteration benchmark results aggregated into a run report
//!
//! A failed iteration never aborts the run; it is captured here with its
//! diagnostic and the loop moves on. The report is uploaded alongside the
//! results summary so a partially failed run is visible after the fact.

use serde::{Deserialize, Serialize};

/// Outcome of a single benchmark iteration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationResult {
    /// Iteration number (1-based)
    pub iteration: u32,
    /// Whether fio exited zero and the raw output was uploaded
    pub success: bool,
    /// Object key of the uploaded raw output, when successful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    /// Captured diagnostic, when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationResult {
    /// Record a successful iteration with its uploaded object key
    pub fn success(iteration: u32, output_key: impl Into<String>) -> Self {
        Self {
            iteration,
            success: true,
            output_key: Some(output_key.into()),
            error: None,
        }
    }

    /// Record a failed iteration with its diagnostic
    pub fn failure(iteration: u32, error: impl Into<String>) -> Self {
        Self {
            iteration,
            success: false,
            output_key: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregated report for one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// Test-case identifier the run executed under
    pub case_id: String,
    /// Per-iteration outcomes, in execution order
    pub results: Vec<IterationResult>,
}

impl RunReport {
    /// Create an empty report for a test case
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            results: Vec::new(),
        }
    }

    /// Append an iteration outcome
    pub fn record(&mut self, result: IterationResult) {
        self.results.push(result);
    }

    /// Number of successful iterations
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of failed iterations
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True when every iteration failed
    pub fn is_total_failure(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == 0
    }
}

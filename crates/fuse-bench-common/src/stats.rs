//! Metric statistics utility
//!
//! Provides `MetricStats` for computing avg/stddev/min/max from a set of
//! per-iteration metric values.

/// Statistics for a collection of metric values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricStats {
    /// Arithmetic mean
    pub avg: f64,
    /// Sample standard deviation; `None` with fewer than two values
    pub stddev: Option<f64>,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Number of valid values
    pub count: usize,
}

impl MetricStats {
    /// Compute statistics from a slice of values.
    ///
    /// Filters out non-finite values (NaN, infinity) before computing.
    /// Standard deviation uses the sample (n-1) denominator.
    pub fn from_values(values: &[f64]) -> Self {
        let valid: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();

        if valid.is_empty() {
            return Self::default();
        }

        let count = valid.len();
        let sum: f64 = valid.iter().sum();
        let avg = sum / count as f64;
        let min = valid
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(0.0);
        let max = valid
            .iter()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(0.0);

        let stddev = if count > 1 {
            let sum_sq_diff: f64 = valid.iter().map(|x| (x - avg).powi(2)).sum();
            Some((sum_sq_diff / (count - 1) as f64).sqrt())
        } else {
            None
        };

        Self {
            avg,
            stddev,
            min,
            max,
            count,
        }
    }

    /// Check if no valid values were provided
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

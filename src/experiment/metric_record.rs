//! Metric Record - time-series metrics emitted by jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric Record represents a single metric data point.
///
/// Metrics are partitioned by `trial_component_name` + `key` and ordered
/// by `step`. `timestamp` keeps wall-clock correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    trial_component_name: String,
    key: String,
    step: u64,
    value: f64,
    timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// Create a new metric record.
    ///
    /// # Arguments
    ///
    /// * `trial_component_name` - Component (job) that emitted the metric
    /// * `key` - Metric name/key (e.g., "loss", "accuracy")
    /// * `step` - Training step or epoch number
    /// * `value` - Metric value
    #[must_use]
    pub fn new(
        trial_component_name: impl Into<String>,
        key: impl Into<String>,
        step: u64,
        value: f64,
    ) -> Self {
        Self {
            trial_component_name: trial_component_name.into(),
            key: key.into(),
            step,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Same metric, with a custom timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Get the emitting component name.
    #[must_use]
    pub fn trial_component_name(&self) -> &str {
        &self.trial_component_name
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the step/epoch number.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the timestamp when the metric was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Rebind the metric to another component name.
    pub(crate) fn for_component(mut self, trial_component_name: &str) -> Self {
        self.trial_component_name = trial_component_name.to_string();
        self
    }
}

/// Aggregate statistics of one metric series, as shown in analytics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean
    pub avg: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Value at the highest step
    pub last: f64,
    /// Number of data points
    pub count: u64,
}

impl MetricSummary {
    /// Summarize a series of data points for a single key.
    ///
    /// Returns `None` for an empty series.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_series<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MetricRecord>,
    {
        // Welford's running mean and sum of squared deviations
        let mut count = 0_u64;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut last: Option<(u64, f64)> = None;

        for point in points {
            let v = point.value();
            count += 1;
            let delta = v - mean;
            mean += delta / count as f64;
            m2 += delta * (v - mean);
            min = min.min(v);
            max = max.max(v);
            if last.map_or(true, |(step, _)| point.step() >= step) {
                last = Some((point.step(), v));
            }
        }

        let (_, last) = last?;
        let variance = (m2 / count as f64).max(0.0);

        Some(Self {
            min,
            max,
            avg: mean,
            std_dev: variance.sqrt(),
            last,
            count,
        })
    }
}

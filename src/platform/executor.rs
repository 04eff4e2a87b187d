//! Pluggable job bodies for the local platform.

use std::collections::BTreeMap;

use super::{JobKind, JobSpec, JobStatus};
use crate::experiment::{ArtifactRecord, MetricRecord};

/// What a job produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Final status
    pub status: JobStatus,
    /// Metric data points emitted while running
    pub metrics: Vec<MetricRecord>,
    /// Output artifacts by name
    pub output_artifacts: BTreeMap<String, ArtifactRecord>,
    /// Failure reason, for failed jobs
    pub failure_reason: Option<String>,
}

impl JobOutcome {
    /// A completed job with no metrics and no outputs.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            metrics: Vec::new(),
            output_artifacts: BTreeMap::new(),
            failure_reason: None,
        }
    }

    /// A failed job.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            failure_reason: Some(reason.into()),
            ..Self::completed()
        }
    }

    /// Add a metric data point.
    #[must_use]
    pub fn metric(mut self, key: &str, step: u64, value: f64) -> Self {
        // Component name is bound by the registry on logging.
        self.metrics.push(MetricRecord::new("", key, step, value));
        self
    }

    /// Add an output artifact.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, artifact: ArtifactRecord) -> Self {
        self.output_artifacts.insert(name.into(), artifact);
        self
    }
}

/// Runs the body of a job on the local platform.
pub trait JobExecutor: Send + Sync {
    /// Run `spec` to completion.
    fn execute(&self, spec: &JobSpec) -> JobOutcome;
}

impl<F> JobExecutor for F
where
    F: Fn(&JobSpec) -> JobOutcome + Send + Sync,
{
    fn execute(&self, spec: &JobSpec) -> JobOutcome {
        self(spec)
    }
}

/// Completes every job immediately.
///
/// Training jobs report a model artifact under their output path; transform
/// jobs report their output path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl JobExecutor for NoopExecutor {
    fn execute(&self, spec: &JobSpec) -> JobOutcome {
        let prefix = spec.output_path.trim_end_matches('/');
        match spec.kind {
            JobKind::Training => JobOutcome::completed().output(
                "SageMaker.ModelArtifact",
                ArtifactRecord::new(format!("{prefix}/{}/output/model.tar.gz", spec.job_name)),
            ),
            JobKind::Transform => JobOutcome::completed().output(
                "SageMaker.TransformOutput",
                ArtifactRecord::new(prefix.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_training_reports_model() {
        let spec = JobSpec::new("train-1", JobKind::Training, "img", "ml.m5.xlarge")
            .output_path("s3://bucket/models/");
        let outcome = NoopExecutor.execute(&spec);

        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(
            outcome.output_artifacts["SageMaker.ModelArtifact"].value(),
            "s3://bucket/models/train-1/output/model.tar.gz"
        );
    }

    #[test]
    fn test_closure_executor() {
        let executor = |_: &JobSpec| JobOutcome::failed("out of memory");
        let spec = JobSpec::new("t", JobKind::Transform, "img", "ml.m5.xlarge");
        let outcome = executor.execute(&spec);
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.failure_reason.as_deref(), Some("out of memory"));
    }
}

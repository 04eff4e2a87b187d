//! Job-execution platform seam.
//!
//! The platform runs training and transform jobs. When a submission carries
//! an [`ExperimentConfig`], the platform itself records a trial component for
//! the job and associates it with the trial of the current workflow run; the
//! façade only passes the metadata along and checks the result.

mod executor;
mod local;

pub use executor::{JobExecutor, JobOutcome, NoopExecutor};
pub use local::LocalPlatform;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlator::ExperimentConfig;
use crate::experiment::{ParameterValue, TrialComponentStatus};
use crate::Result;

/// Job tag carrying the orchestrator run identity.
///
/// Jobs sharing this tag and an experiment land in the same trial.
pub const RUN_ID_TAG: &str = "workflow-run-id";

/// Kind of platform job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Model training job
    Training,
    /// Batch inference job
    Transform,
}

impl JobKind {
    /// Resource segment used in job ARNs.
    #[must_use]
    pub const fn resource_type(self) -> &'static str {
        match self {
            Self::Training => "training-job",
            Self::Transform => "transform-job",
        }
    }

    /// Source type recorded on trial components.
    #[must_use]
    pub const fn source_type(self) -> &'static str {
        match self {
            Self::Training => "SageMakerTrainingJob",
            Self::Transform => "SageMakerTransformJob",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// Status of a platform job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted, still running
    InProgress,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped before finishing
    Stopped,
}

impl From<JobStatus> for TrialComponentStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::InProgress => Self::InProgress,
            JobStatus::Completed => Self::Completed,
            JobStatus::Failed => Self::Failed,
            JobStatus::Stopped => Self::Stopped,
        }
    }
}

/// Everything the platform needs to run one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    /// Unique job name; the platform's idempotency key
    pub job_name: String,
    /// Job kind
    pub kind: JobKind,
    /// Container image or framework identifier
    pub image: String,
    /// Instance type, e.g. `ml.m5.xlarge`
    pub instance_type: String,
    /// Number of instances
    pub instance_count: u32,
    /// Input channels: name → data URI
    pub inputs: BTreeMap<String, String>,
    /// Output location prefix
    pub output_path: String,
    /// Training job whose model a transform job serves
    pub model_source_job: Option<String>,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, ParameterValue>,
    /// Free-form tags
    pub tags: BTreeMap<String, String>,
}

impl JobSpec {
    /// Start a spec with required fields and a single instance.
    #[must_use]
    pub fn new(
        job_name: impl Into<String>,
        kind: JobKind,
        image: impl Into<String>,
        instance_type: impl Into<String>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            kind,
            image: image.into(),
            instance_type: instance_type.into(),
            instance_count: 1,
            inputs: BTreeMap::new(),
            output_path: String::new(),
            model_source_job: None,
            hyperparameters: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Set the instance count.
    #[must_use]
    pub const fn instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    /// Add an input channel.
    #[must_use]
    pub fn input(mut self, channel: impl Into<String>, uri: impl Into<String>) -> Self {
        self.inputs.insert(channel.into(), uri.into());
        self
    }

    /// Set the output location prefix.
    #[must_use]
    pub fn output_path(mut self, uri: impl Into<String>) -> Self {
        self.output_path = uri.into();
        self
    }

    /// Serve the model produced by a training job.
    #[must_use]
    pub fn model_source_job(mut self, training_job: impl Into<String>) -> Self {
        self.model_source_job = Some(training_job.into());
        self
    }

    /// Add a hyperparameter.
    #[must_use]
    pub fn hyperparameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.hyperparameters.insert(name.into(), value.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Identity of an accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Job name
    pub job_name: String,
    /// Job ARN; the source reference of its trial component
    pub job_arn: String,
    /// Job kind
    pub kind: JobKind,
}

/// Current state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    /// Job identity
    pub handle: JobHandle,
    /// Status
    pub status: JobStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Completion time, once terminal
    pub ended_at: Option<DateTime<Utc>>,
    /// Model artifact URI of a completed training job
    pub model_artifacts: Option<String>,
    /// Why the job failed
    pub failure_reason: Option<String>,
    /// Tags given at submission
    pub tags: BTreeMap<String, String>,
}

/// External job-execution platform.
pub trait JobPlatform: Send + Sync {
    /// Submit a job, optionally tracked under an experiment.
    ///
    /// With `experiment_config`, the platform creates the run's trial if
    /// needed, records a trial component for the job, and associates it.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` (kind `Job`) if the job name was used before
    /// - `SubmitFailed` if the platform rejects the spec
    /// - `TransientPlatformError` on throttling or transport failures
    fn submit(
        &self,
        spec: JobSpec,
        experiment_config: Option<&ExperimentConfig>,
    ) -> Result<JobHandle>;

    /// Describe a job by name.
    ///
    /// # Errors
    ///
    /// `NotFound` (kind `Job`) if no such job.
    fn describe(&self, job_name: &str) -> Result<JobDescription>;
}

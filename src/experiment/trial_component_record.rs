//! Trial Component Record - one unit of external work inside a trial

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactRecord, TrialSource};

/// Status of the external job behind a trial component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialComponentStatus {
    /// Job accepted and still executing.
    InProgress,
    /// Job completed successfully.
    Completed,
    /// Job failed after submission.
    Failed,
    /// Job was stopped by user or system.
    Stopped,
}

impl TrialComponentStatus {
    /// Whether the job has reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for TrialComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Hyperparameter or configuration value recorded on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Numeric parameter
    Number(f64),
    /// Free-form string parameter
    String(String),
}

impl ParameterValue {
    /// Numeric value, if this parameter is a number.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::String(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u32> for ParameterValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Trial Component Record represents one external job tracked in a trial.
///
/// The association with a trial is mutable: a component can be detached
/// and later deleted without touching the underlying job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialComponentRecord {
    name: String,
    display_name: String,
    source: Option<TrialSource>,
    status: TrialComponentStatus,
    trial_name: Option<String>,
    parameters: BTreeMap<String, ParameterValue>,
    input_artifacts: BTreeMap<String, ArtifactRecord>,
    output_artifacts: BTreeMap<String, ArtifactRecord>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl TrialComponentRecord {
    /// Create a new, unassociated component in `InProgress` status.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique component name (the job name for auto-recorded components)
    /// * `display_name` - Task-level label, e.g. `Training`
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::builder(name, display_name).build()
    }

    /// Create a builder for constructing a component with optional fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> TrialComponentRecordBuilder {
        TrialComponentRecordBuilder::new(name, display_name)
    }

    /// Get the component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Get the source reference of the external job.
    #[must_use]
    pub const fn source(&self) -> Option<&TrialSource> {
        self.source.as_ref()
    }

    /// Get the job status.
    #[must_use]
    pub const fn status(&self) -> TrialComponentStatus {
        self.status
    }

    /// Get the trial this component is associated with, if any.
    #[must_use]
    pub fn trial_name(&self) -> Option<&str> {
        self.trial_name.as_deref()
    }

    /// Get the recorded parameters, ordered by name.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<String, ParameterValue> {
        &self.parameters
    }

    /// Get the input artifacts, ordered by name.
    #[must_use]
    pub const fn input_artifacts(&self) -> &BTreeMap<String, ArtifactRecord> {
        &self.input_artifacts
    }

    /// Get the output artifacts, ordered by name.
    #[must_use]
    pub const fn output_artifacts(&self) -> &BTreeMap<String, ArtifactRecord> {
        &self.output_artifacts
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the start timestamp, if the job has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the job has finished.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Associate with a trial.
    pub(crate) fn attach(&mut self, trial_name: impl Into<String>) {
        self.trial_name = Some(trial_name.into());
    }

    /// Drop the trial association.
    pub(crate) fn detach(&mut self) {
        self.trial_name = None;
    }

    /// Mark the job as started.
    pub fn start(&mut self, at: DateTime<Utc>) {
        self.status = TrialComponentStatus::InProgress;
        self.started_at = Some(at);
    }

    /// Record the final status of the job.
    pub fn complete(&mut self, status: TrialComponentStatus, at: DateTime<Utc>) {
        self.status = status;
        self.ended_at = Some(at);
    }

    /// Record an output artifact produced by the job.
    pub fn add_output_artifact(&mut self, name: impl Into<String>, artifact: ArtifactRecord) {
        self.output_artifacts.insert(name.into(), artifact);
    }
}

/// Builder for `TrialComponentRecord`.
#[derive(Debug)]
pub struct TrialComponentRecordBuilder {
    record: TrialComponentRecord,
}

impl TrialComponentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            record: TrialComponentRecord {
                name: name.into(),
                display_name: display_name.into(),
                source: None,
                status: TrialComponentStatus::InProgress,
                trial_name: None,
                parameters: BTreeMap::new(),
                input_artifacts: BTreeMap::new(),
                output_artifacts: BTreeMap::new(),
                created_at: Utc::now(),
                started_at: None,
                ended_at: None,
            },
        }
    }

    /// Set the source reference.
    #[must_use]
    pub fn source(mut self, source: TrialSource) -> Self {
        self.record.source = Some(source);
        self
    }

    /// Set a parameter.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.record.parameters.insert(name.into(), value.into());
        self
    }

    /// Set an input artifact.
    #[must_use]
    pub fn input_artifact(mut self, name: impl Into<String>, artifact: ArtifactRecord) -> Self {
        self.record.input_artifacts.insert(name.into(), artifact);
        self
    }

    /// Set an output artifact.
    #[must_use]
    pub fn output_artifact(mut self, name: impl Into<String>, artifact: ArtifactRecord) -> Self {
        self.record.output_artifacts.insert(name.into(), artifact);
        self
    }

    /// Set the initial status.
    #[must_use]
    pub const fn status(mut self, status: TrialComponentStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set a custom creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    /// Build the `TrialComponentRecord`.
    #[must_use]
    pub fn build(self) -> TrialComponentRecord {
        self.record
    }
}

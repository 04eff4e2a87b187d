//! Trial Record - one logical workflow run within an experiment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to the external resource that caused a record to exist.
///
/// `source_arn` is opaque to this crate and is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TrialSource {
    /// Identifier/URI of the external job
    pub source_arn: String,
    /// Resource type, e.g. `SageMakerTrainingJob`
    pub source_type: Option<String>,
}

impl TrialSource {
    /// Create a source reference.
    #[must_use]
    pub fn new(source_arn: impl Into<String>, source_type: Option<String>) -> Self {
        Self {
            source_arn: source_arn.into(),
            source_type,
        }
    }
}

/// Trial Record groups the trial components of one workflow run.
///
/// Ownership by the experiment is by reference: the trial stores the
/// experiment name and is looked up by its own name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialRecord {
    name: String,
    experiment_name: String,
    display_name: Option<String>,
    source: Option<TrialSource>,
    created_at: DateTime<Utc>,
}

impl TrialRecord {
    /// Create a new trial record under `experiment_name`.
    #[must_use]
    pub fn new(name: impl Into<String>, experiment_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            experiment_name: experiment_name.into(),
            display_name: None,
            source: None,
            created_at: Utc::now(),
        }
    }

    /// Create a builder for constructing a trial record with optional fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        experiment_name: impl Into<String>,
    ) -> TrialRecordBuilder {
        TrialRecordBuilder::new(name, experiment_name)
    }

    /// Get the trial name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the owning experiment name.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Get the display name, falling back to the name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Get the originating source, if the trial was created by a job.
    #[must_use]
    pub const fn source(&self) -> Option<&TrialSource> {
        self.source.as_ref()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for `TrialRecord`.
#[derive(Debug)]
pub struct TrialRecordBuilder {
    name: String,
    experiment_name: String,
    display_name: Option<String>,
    source: Option<TrialSource>,
    created_at: DateTime<Utc>,
}

impl TrialRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, experiment_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            experiment_name: experiment_name.into(),
            display_name: None,
            source: None,
            created_at: Utc::now(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the originating source.
    #[must_use]
    pub fn source(mut self, source: TrialSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set a custom creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        TrialRecord {
            name: self.name,
            experiment_name: self.experiment_name,
            display_name: self.display_name,
            source: self.source,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_record_new() {
        let trial = TrialRecord::new("trial-1", "exp-1");
        assert_eq!(trial.name(), "trial-1");
        assert_eq!(trial.experiment_name(), "exp-1");
        assert!(trial.source().is_none());
    }

    #[test]
    fn test_trial_source_serializes_pascal_case() {
        let source = TrialSource::new("arn:aws:sagemaker:x", Some("SageMakerTrainingJob".into()));
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["SourceArn"], "arn:aws:sagemaker:x");
        assert_eq!(json["SourceType"], "SageMakerTrainingJob");
    }
}

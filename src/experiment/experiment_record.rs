//! Experiment Record - root entity for experiment tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experiment Record represents a named study.
///
/// This is the root entity in the tracking schema. Trials reference an
/// experiment by name; the experiment does not hold them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    name: String,
    description: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Create a new experiment record with the given name and description.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique, human-chosen experiment name
    /// * `description` - Free-form description
    ///
    /// # Returns
    ///
    /// A new `ExperimentRecord` with the current timestamp.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    /// Create a builder for constructing an experiment record with optional fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(name, description)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the display name, falling back to the name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    name: String,
    description: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    /// Set a display name distinct from the unique name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            name: self.name,
            description: self.description,
            display_name: self.display_name,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_record_new() {
        let record = ExperimentRecord::new("fashion-mnist", "CNN on Fashion-MNIST");
        assert_eq!(record.name(), "fashion-mnist");
        assert_eq!(record.description(), "CNN on Fashion-MNIST");
        assert_eq!(record.display_name(), "fashion-mnist");
    }

    #[test]
    fn test_experiment_record_builder() {
        let record = ExperimentRecord::builder("exp-1", "desc")
            .display_name("Experiment One")
            .build();

        assert_eq!(record.name(), "exp-1");
        assert_eq!(record.display_name(), "Experiment One");
    }
}

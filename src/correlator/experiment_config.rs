//! Typed experiment metadata attached to job submissions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EntityKind;
use crate::experiment::{validate_name, MAX_NAME_LEN};
use crate::{Error, Result};

/// The `experiment_config` of a job submission.
///
/// Serializes to exactly `{"ExperimentName": .., "TrialComponentDisplayName": ..}`
/// and is validated on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "RawExperimentConfig")]
pub struct ExperimentConfig {
    experiment_name: String,
    trial_component_display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawExperimentConfig {
    experiment_name: String,
    trial_component_display_name: String,
}

impl TryFrom<RawExperimentConfig> for ExperimentConfig {
    type Error = Error;

    fn try_from(raw: RawExperimentConfig) -> Result<Self> {
        Self::new(raw.experiment_name, raw.trial_component_display_name)
    }
}

impl ExperimentConfig {
    /// Build a validated config.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the experiment name breaks the naming rule,
    /// or the display name is empty, too long, or contains control characters.
    pub fn new(
        experiment_name: impl Into<String>,
        trial_component_display_name: impl Into<String>,
    ) -> Result<Self> {
        let experiment_name = experiment_name.into();
        let trial_component_display_name = trial_component_display_name.into();

        validate_name(EntityKind::Experiment, &experiment_name, MAX_NAME_LEN)?;
        let display = trial_component_display_name.trim();
        if display.is_empty() {
            return Err(Error::InvalidInput(
                "trial component display name must not be blank".into(),
            ));
        }
        if display.len() > MAX_NAME_LEN || display.chars().any(char::is_control) {
            return Err(Error::InvalidInput(format!(
                "trial component display name '{display}' must be at most {MAX_NAME_LEN} printable characters"
            )));
        }

        Ok(Self {
            experiment_name,
            trial_component_display_name,
        })
    }

    /// Experiment the job is tracked under.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Label of the job's trial component.
    #[must_use]
    pub fn trial_component_display_name(&self) -> &str {
        &self.trial_component_display_name
    }

    /// The wire form: field name → value.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("ExperimentName", self.experiment_name.as_str()),
            (
                "TrialComponentDisplayName",
                self.trial_component_display_name.as_str(),
            ),
        ])
    }
}

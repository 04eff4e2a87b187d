//! The two tasks of the training → batch inference workflow.

use serde::{Deserialize, Serialize};

use super::{RunContext, Task};
use crate::correlator::{RunCorrelator, TrackedJob};
use crate::platform::{JobKind, JobSpec};
use crate::{Error, Result};

/// Hyperparameters passed to the training container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingHyperparameters {
    /// Passes over the training set
    pub epochs: u32,
    /// Examples per gradient step
    pub batch_size: u32,
    /// Optimizer step size
    pub learning_rate: f64,
}

impl Default for TrainingHyperparameters {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 256,
            learning_rate: 0.01,
        }
    }
}

impl TrainingHyperparameters {
    /// Validate the hyperparameters.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for zero counts or a non-positive learning rate.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidInput("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidInput(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Where and how a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Container image or framework identifier
    pub image: String,
    /// Instance type
    pub instance_type: String,
    /// Number of instances
    pub instance_count: u32,
    /// Output location prefix
    pub output_path: String,
}

impl EstimatorConfig {
    /// Single-instance estimator.
    #[must_use]
    pub fn new(
        image: impl Into<String>,
        instance_type: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            instance_type: instance_type.into(),
            instance_count: 1,
            output_path: output_path.into(),
        }
    }

    fn spec(&self, job_name: String, kind: JobKind) -> JobSpec {
        JobSpec::new(job_name, kind, &self.image, &self.instance_type)
            .instance_count(self.instance_count)
            .output_path(&self.output_path)
    }
}

fn channel(data_location: &str, name: &str) -> String {
    format!("{}/{name}", data_location.trim_end_matches('/'))
}

/// Trains the model on `<data>/train`, validating on `<data>/test`.
#[derive(Debug, Clone)]
pub struct TrainingTask {
    task_id: String,
    display_name: String,
    estimator: EstimatorConfig,
    hyperparameters: TrainingHyperparameters,
}

impl TrainingTask {
    /// Create a training task labelled `Training`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the hyperparameters are invalid.
    pub fn new(
        task_id: impl Into<String>,
        estimator: EstimatorConfig,
        hyperparameters: TrainingHyperparameters,
    ) -> Result<Self> {
        hyperparameters.validate()?;
        Ok(Self {
            task_id: task_id.into(),
            display_name: "Training".to_string(),
            estimator,
            hyperparameters,
        })
    }

    /// Use a different trial component display name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

impl Task for TrainingTask {
    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn upstream(&self) -> &[String] {
        &[]
    }

    fn run(
        &self,
        data_location: &str,
        run: &RunContext,
        correlator: &RunCorrelator<'_>,
    ) -> Result<TrackedJob> {
        let hp = &self.hyperparameters;
        let spec = self
            .estimator
            .spec(RunCorrelator::job_name(run, &self.task_id), JobKind::Training)
            .input("training", channel(data_location, "train"))
            .input("test", channel(data_location, "test"))
            .hyperparameter("epochs", hp.epochs)
            .hyperparameter("batch_size", hp.batch_size)
            .hyperparameter("learning_rate", hp.learning_rate);

        correlator.submit(run, &self.display_name, spec)
    }
}

/// Runs batch inference on `<data>/test` with the model of an upstream
/// training task.
#[derive(Debug, Clone)]
pub struct TransformTask {
    task_id: String,
    display_name: String,
    estimator: EstimatorConfig,
    upstream: Vec<String>,
}

impl TransformTask {
    /// Create a transform task labelled `Transform`, serving the model
    /// trained by `training_task_id`.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        training_task_id: impl Into<String>,
        estimator: EstimatorConfig,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            display_name: "Transform".to_string(),
            estimator,
            upstream: vec![training_task_id.into()],
        }
    }

    /// Use a different trial component display name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

impl Task for TransformTask {
    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn upstream(&self) -> &[String] {
        &self.upstream
    }

    fn run(
        &self,
        data_location: &str,
        run: &RunContext,
        correlator: &RunCorrelator<'_>,
    ) -> Result<TrackedJob> {
        let training = run.upstream_job(&self.upstream[0])?;
        let spec = self
            .estimator
            .spec(RunCorrelator::job_name(run, &self.task_id), JobKind::Transform)
            .input("data", channel(data_location, "test"))
            .model_source_job(training.job_name());

        correlator.submit(run, &self.display_name, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyperparameters_validate() {
        TrainingHyperparameters::default().validate().unwrap();
        let bad = TrainingHyperparameters {
            learning_rate: 0.0,
            ..TrainingHyperparameters::default()
        };
        assert!(bad.validate().is_err());
        let bad = TrainingHyperparameters {
            epochs: 0,
            ..TrainingHyperparameters::default()
        };
        assert!(TrainingTask::new("training", EstimatorConfig::new("i", "t", "o"), bad).is_err());
    }

    #[test]
    fn test_channel_joins_paths() {
        assert_eq!(channel("s3://bucket/data/", "train"), "s3://bucket/data/train");
        assert_eq!(channel("s3://bucket/data", "test"), "s3://bucket/data/test");
    }

    #[test]
    fn test_transform_upstream() {
        let task = TransformTask::new("transform", "training", EstimatorConfig::new("i", "t", "o"));
        assert_eq!(task.upstream(), ["training".to_string()]);
    }
}

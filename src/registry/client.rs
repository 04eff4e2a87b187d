//! Experiment Registry Client

use tracing::{debug, info};

use crate::error::EntityKind;
use crate::experiment::ExperimentRecord;
use crate::{Error, Result, TrackingContext};

/// Creates, loads and deletes experiments.
///
/// Holds no state besides the context: every call is a round trip to the
/// registry, so concurrent callers always observe the stored record.
///
/// # Example
///
/// ```rust
/// use workflow_trials::registry::ExperimentRegistryClient;
/// use workflow_trials::TrackingContext;
///
/// # fn example() -> workflow_trials::Result<()> {
/// let ctx = TrackingContext::in_memory();
/// let client = ExperimentRegistryClient::new(&ctx);
///
/// let created = client.create("fashion-mnist", "CNN classifier")?;
/// let loaded = client.load("fashion-mnist")?;
/// assert_eq!(created.description(), loaded.description());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExperimentRegistryClient<'a> {
    ctx: &'a TrackingContext,
}

impl<'a> ExperimentRegistryClient<'a> {
    /// Create a client over `ctx`.
    #[must_use]
    pub const fn new(ctx: &'a TrackingContext) -> Self {
        Self { ctx }
    }

    /// Create an experiment.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken; `InvalidInput` for a bad name.
    pub fn create(&self, name: &str, description: &str) -> Result<ExperimentRecord> {
        let record = ExperimentRecord::new(name, description);
        self.ctx.registry().create_experiment(record.clone())?;
        info!(experiment = name, "experiment created");
        Ok(record)
    }

    /// Load an experiment.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub fn load(&self, name: &str) -> Result<ExperimentRecord> {
        let record = self.ctx.registry().get_experiment(name)?;
        debug!(experiment = name, "experiment loaded");
        Ok(record)
    }

    /// Create the experiment, or load it if it already exists.
    ///
    /// An existing record is returned as stored; `description` is not
    /// applied to it.
    ///
    /// # Errors
    ///
    /// Any error other than `AlreadyExists` from create, or any error from load.
    pub fn create_or_load(&self, name: &str, description: &str) -> Result<ExperimentRecord> {
        match self.create(name, description) {
            Err(Error::AlreadyExists {
                kind: EntityKind::Experiment,
                ..
            }) => {
                debug!(experiment = name, "experiment exists, reusing");
                self.load(name)
            }
            other => other,
        }
    }

    /// Delete an experiment.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `HasDependents` while trials reference it.
    pub fn delete(&self, experiment: &ExperimentRecord) -> Result<()> {
        self.ctx.registry().delete_experiment(experiment.name())?;
        info!(experiment = experiment.name(), "experiment deleted");
        Ok(())
    }
}

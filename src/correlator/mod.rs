//! Run Correlator
//!
//! Binds an orchestrator task invocation to a trial component of the
//! experiment, so all tasks of one workflow run land under one trial.
//!
//! ```text
//! PENDING ──submit──> SUBMITTED(job_name) ──component found──> TRACKED
//!    │                       │
//!    └──rejected──> SUBMIT_FAILED   └──component missing──> (stays SUBMITTED, TrackingFailed)
//! ```
//!
//! The platform does the recording; the correlator only attaches the
//! metadata, derives a stable job name, and verifies the outcome.

mod experiment_config;

pub use experiment_config::ExperimentConfig;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EntityKind;
use crate::experiment::{unique_name, MAX_JOB_NAME_LEN};
use crate::platform::{JobHandle, JobPlatform, JobSpec, RUN_ID_TAG};
use crate::workflow::RunContext;
use crate::{Error, Result, TrackingContext};

/// Lifecycle of one task attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Not yet submitted
    Pending,
    /// Job accepted by the platform; tracking not confirmed
    Submitted {
        /// Submitted job
        job_name: String,
    },
    /// Job accepted and its trial component is recorded
    Tracked {
        /// Submitted job
        job_name: String,
        /// Trial the component is associated with
        trial_name: String,
    },
    /// Submission rejected; reported to the orchestrator
    SubmitFailed {
        /// Why
        reason: String,
    },
}

impl TaskState {
    /// Whether the attempt is over.
    ///
    /// `Submitted` is terminal only when reached through a tracking failure,
    /// which the caller learns from the error; on its own it is not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Tracked { .. } | Self::SubmitFailed { .. })
    }

    /// State a task attempt ends in, given what it returned.
    #[must_use]
    pub fn from_outcome(outcome: &Result<TrackedJob>) -> Self {
        match outcome {
            Ok(job) => Self::Tracked {
                job_name: job.job_name().to_string(),
                trial_name: job.trial_name.clone(),
            },
            Err(Error::TrackingFailed { job_name, .. }) => Self::Submitted {
                job_name: job_name.clone(),
            },
            Err(e) => Self::SubmitFailed {
                reason: e.to_string(),
            },
        }
    }
}

/// A submitted job together with where it was tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedJob {
    /// Platform identity of the job
    pub handle: JobHandle,
    /// Trial holding the job's component
    pub trial_name: String,
    /// The job's trial component
    pub trial_component_name: String,
}

impl TrackedJob {
    /// Name of the job.
    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.handle.job_name
    }
}

/// Submits task jobs with experiment metadata and confirms they were tracked.
pub struct RunCorrelator<'a> {
    ctx: &'a TrackingContext,
    platform: &'a dyn JobPlatform,
    experiment_name: String,
}

impl<'a> RunCorrelator<'a> {
    /// Correlate jobs submitted to `platform` with `experiment_name`.
    #[must_use]
    pub fn new(
        ctx: &'a TrackingContext,
        platform: &'a dyn JobPlatform,
        experiment_name: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            platform,
            experiment_name: experiment_name.into(),
        }
    }

    /// Experiment jobs are tracked under.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Deterministic job name for `task_id` within `run`.
    ///
    /// The same task in the same run always maps to the same name, which the
    /// platform uses as its idempotency key. A `{task_id}-{run_id}` that is
    /// not already a valid name, or would exceed the platform limit, keeps a
    /// readable prefix and ends in a hash of the `(task_id, run_id)` pair.
    #[must_use]
    pub fn job_name(run: &RunContext, task_id: &str) -> String {
        unique_name(
            &format!("{task_id}-{}", run.run_id()),
            &(task_id, run.run_id()),
            MAX_JOB_NAME_LEN,
        )
    }

    /// Submit `spec` for the task labelled `display_name` in `run`.
    ///
    /// Tags the job with the run id and attaches
    /// `{ExperimentName, TrialComponentDisplayName}`. If the job name was
    /// already used (a retried task), the existing job is reattached instead
    /// of submitting a duplicate.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the display name is unusable
    /// - `TransientPlatformError` unchanged from the platform
    /// - `SubmitFailed` for any other rejection
    /// - `TrackingFailed` if the job ran but no trial component of this
    ///   experiment records it
    pub fn submit(&self, run: &RunContext, display_name: &str, mut spec: JobSpec) -> Result<TrackedJob> {
        let config = ExperimentConfig::new(&self.experiment_name, display_name)?;
        spec.tags
            .insert(RUN_ID_TAG.to_string(), run.run_id().to_string());
        let job_name = spec.job_name.clone();

        debug!(job = %job_name, state = ?TaskState::Pending, "submitting");
        let handle = match self.platform.submit(spec, Some(&config)) {
            Ok(handle) => handle,
            Err(Error::AlreadyExists {
                kind: EntityKind::Job,
                ..
            }) => {
                info!(job = %job_name, "job already submitted, reattaching");
                self.platform.describe(&job_name)?.handle
            }
            Err(e) if e.is_transient() => {
                warn!(job = %job_name, error = %e, "transient submission failure");
                return Err(e);
            }
            Err(Error::SubmitFailed { job_name, reason }) => {
                warn!(job = %job_name, %reason, "submission rejected");
                return Err(Error::SubmitFailed { job_name, reason });
            }
            Err(e) => {
                warn!(job = %job_name, error = %e, "submission rejected");
                return Err(Error::SubmitFailed {
                    job_name,
                    reason: e.to_string(),
                });
            }
        };
        debug!(job = %job_name, state = ?TaskState::Submitted { job_name: job_name.clone() }, "submitted");

        let tracked = self.confirm_tracking(handle)?;
        info!(
            job = %job_name,
            trial = %tracked.trial_name,
            display_name,
            "job tracked"
        );
        Ok(tracked)
    }

    /// Check that the job's trial component exists and belongs to this experiment.
    fn confirm_tracking(&self, handle: JobHandle) -> Result<TrackedJob> {
        let registry = self.ctx.registry();
        let untracked = |reason: String| Error::TrackingFailed {
            job_name: handle.job_name.clone(),
            reason,
        };

        let component = registry
            .find_trial_component_by_source(&handle.job_arn)?
            .ok_or_else(|| untracked(format!("no trial component has source {}", handle.job_arn)))?;
        let trial_name = component
            .trial_name()
            .ok_or_else(|| untracked(format!("trial component '{}' is not in a trial", component.name())))?
            .to_string();

        let trial = match registry.get_trial(&trial_name) {
            Ok(trial) => trial,
            Err(e) if e.is_not_found(EntityKind::Trial) => {
                return Err(untracked(format!("trial '{trial_name}' no longer exists")))
            }
            Err(e) => return Err(e),
        };
        if trial.experiment_name() != self.experiment_name {
            return Err(untracked(format!(
                "trial '{trial_name}' belongs to experiment '{}'",
                trial.experiment_name()
            )));
        }

        Ok(TrackedJob {
            trial_component_name: component.name().to_string(),
            handle,
            trial_name,
        })
    }
}

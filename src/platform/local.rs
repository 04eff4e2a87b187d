//! In-process job platform.
//!
//! Runs jobs synchronously through a [`JobExecutor`] and auto-records trial
//! components into the registry the same way the managed platform does for
//! submissions that carry an [`ExperimentConfig`].

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::{
    JobDescription, JobExecutor, JobHandle, JobKind, JobOutcome, JobPlatform, JobSpec, JobStatus,
    NoopExecutor, RUN_ID_TAG,
};
use crate::config::TrackingConfig;
use crate::correlator::ExperimentConfig;
use crate::error::EntityKind;
use crate::experiment::{
    unique_name, validate_name, ArtifactRecord, TrialComponentRecord, TrialRecord, TrialSource,
    MAX_JOB_NAME_LEN, MAX_NAME_LEN,
};
use crate::registry::Registry;
use crate::{Error, Result, TrackingContext};

/// Local stand-in for the managed job platform.
///
/// Job names are unique for the lifetime of the platform: a second
/// submission under the same name is refused with `AlreadyExists`, which is
/// what keeps resubmitted tasks from producing duplicate trial components.
pub struct LocalPlatform {
    config: TrackingConfig,
    registry: Arc<dyn Registry>,
    executor: Box<dyn JobExecutor>,
    jobs: DashMap<String, JobDescription>,
    clock: Mutex<DateTime<Utc>>,
}

impl LocalPlatform {
    /// Create a platform recording into `ctx`'s registry, completing every
    /// job with [`NoopExecutor`].
    #[must_use]
    pub fn new(ctx: &TrackingContext) -> Self {
        Self {
            config: ctx.config().clone(),
            registry: ctx.registry_handle(),
            executor: Box::new(NoopExecutor),
            jobs: DashMap::new(),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Replace the job executor.
    #[must_use]
    pub fn with_executor(mut self, executor: impl JobExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Number of jobs ever accepted.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Wall-clock time, forced strictly past every timestamp handed out
    /// before, so creation order is total even within one millisecond.
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().max(*last + Duration::milliseconds(1));
        *last = now;
        now
    }

    fn validate_spec(&self, spec: &JobSpec) -> std::result::Result<(), String> {
        validate_name(EntityKind::Job, &spec.job_name, MAX_JOB_NAME_LEN).map_err(|e| e.to_string())?;
        if spec.image.is_empty() {
            return Err("image must not be empty".into());
        }
        if spec.instance_type.is_empty() {
            return Err("instance type must not be empty".into());
        }
        if spec.instance_count == 0 {
            return Err("instance count must be at least 1".into());
        }
        if spec.inputs.is_empty() {
            return Err("at least one input channel is required".into());
        }

        if spec.kind == JobKind::Transform {
            let Some(model_job) = spec.model_source_job.as_deref() else {
                return Err("transform job requires a model source job".into());
            };
            let model = self
                .jobs
                .get(model_job)
                .map(|j| (j.handle.kind, j.status, j.model_artifacts.is_some()));
            match model {
                Some((JobKind::Training, JobStatus::Completed, true)) => {}
                Some(_) => {
                    return Err(format!(
                        "model source job '{model_job}' is not a completed training job"
                    ))
                }
                None => return Err(format!("model source job '{model_job}' does not exist")),
            }
        }
        Ok(())
    }

    /// Trial name for the run a job belongs to.
    ///
    /// One name per `(experiment, run id)` pair; see [`unique_name`].
    fn trial_name(config: &ExperimentConfig, spec: &JobSpec) -> String {
        let run_key = spec
            .tags
            .get(RUN_ID_TAG)
            .map_or(spec.job_name.as_str(), String::as_str);
        let experiment = config.experiment_name();
        unique_name(
            &format!("{experiment}-{run_key}"),
            &(experiment, run_key),
            MAX_NAME_LEN,
        )
    }

    /// Create (or reuse) the run's trial, then record and associate the
    /// job's component. Returns the component name.
    fn record_component(
        &self,
        config: &ExperimentConfig,
        spec: &JobSpec,
        handle: &JobHandle,
        started_at: DateTime<Utc>,
    ) -> Result<String> {
        let registry = self.registry.as_ref();
        registry.get_experiment(config.experiment_name())?;

        let source = TrialSource::new(&handle.job_arn, Some(spec.kind.source_type().to_string()));
        let trial_name = Self::trial_name(config, spec);
        let trial = TrialRecord::builder(&trial_name, config.experiment_name())
            .source(source.clone())
            .created_at(started_at)
            .build();
        match registry.create_trial(trial) {
            Ok(()) => info!(trial = %trial_name, "trial created"),
            Err(Error::AlreadyExists { .. }) => debug!(trial = %trial_name, "trial reused"),
            Err(e) => return Err(e),
        }

        let mut component = TrialComponentRecord::builder(
            &spec.job_name,
            config.trial_component_display_name(),
        )
        .source(source)
        .created_at(started_at)
        .parameter("InstanceType", spec.instance_type.as_str())
        .parameter("InstanceCount", spec.instance_count)
        .parameter("Image", spec.image.as_str());
        for (name, value) in &spec.hyperparameters {
            component = component.parameter(name, value.clone());
        }
        for (channel, uri) in &spec.inputs {
            component = component.input_artifact(channel, ArtifactRecord::new(uri));
        }
        let mut component = component.build();
        component.start(started_at);

        registry.create_trial_component(component)?;
        registry.associate_trial_component(&spec.job_name, &trial_name)?;
        Ok(spec.job_name.clone())
    }

    fn finish_component(&self, component_name: &str, outcome: JobOutcome, ended_at: DateTime<Utc>) -> Result<()> {
        let registry = self.registry.as_ref();
        let mut component = registry.get_trial_component(component_name)?;
        component.complete(outcome.status.into(), ended_at);
        for (name, artifact) in outcome.output_artifacts {
            component.add_output_artifact(name, artifact);
        }
        registry.update_trial_component(component)?;
        if !outcome.metrics.is_empty() {
            registry.log_metrics(component_name, outcome.metrics)?;
        }
        Ok(())
    }
}

impl JobPlatform for LocalPlatform {
    fn submit(
        &self,
        spec: JobSpec,
        experiment_config: Option<&ExperimentConfig>,
    ) -> Result<JobHandle> {
        self.validate_spec(&spec).map_err(|reason| Error::SubmitFailed {
            job_name: spec.job_name.clone(),
            reason,
        })?;

        let handle = JobHandle {
            job_name: spec.job_name.clone(),
            job_arn: self.config.resource_arn(spec.kind.resource_type(), &spec.job_name),
            kind: spec.kind,
        };
        let created_at = self.now();

        match self.jobs.entry(spec.job_name.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::already_exists(EntityKind::Job, &spec.job_name));
            }
            Entry::Vacant(v) => {
                v.insert(JobDescription {
                    handle: handle.clone(),
                    status: JobStatus::InProgress,
                    created_at,
                    ended_at: None,
                    model_artifacts: None,
                    failure_reason: None,
                    tags: spec.tags.clone(),
                });
            }
        }
        info!(job = %handle.job_name, kind = %spec.kind, "job accepted");

        // Tracking problems never fail an accepted job.
        let component = experiment_config.and_then(|config| {
            self.record_component(config, &spec, &handle, created_at)
                .map_err(|e| warn!(job = %handle.job_name, error = %e, "job not tracked"))
                .ok()
        });

        let outcome = self.executor.execute(&spec);
        let ended_at = self.now();
        let model_artifacts = outcome
            .output_artifacts
            .get("SageMaker.ModelArtifact")
            .map(|a| a.value().to_string());

        if let Some(mut job) = self.jobs.get_mut(&handle.job_name) {
            job.status = outcome.status;
            job.ended_at = Some(ended_at);
            job.model_artifacts = model_artifacts;
            job.failure_reason.clone_from(&outcome.failure_reason);
        }
        info!(job = %handle.job_name, status = ?outcome.status, "job finished");

        if let Some(component) = component {
            if let Err(e) = self.finish_component(&component, outcome, ended_at) {
                warn!(job = %handle.job_name, error = %e, "final job state not recorded");
            }
        }

        Ok(handle)
    }

    fn describe(&self, job_name: &str) -> Result<JobDescription> {
        self.jobs
            .get(job_name)
            .map(|j| j.value().clone())
            .ok_or_else(|| Error::not_found(EntityKind::Job, job_name))
    }
}

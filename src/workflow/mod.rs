//! Orchestrator-facing surface: typed run context, tasks, and a sequential
//! local runner for small DAGs.
//!
//! The runner is a driver for the tracking façade, not a scheduler: tasks run
//! one at a time on the calling thread, in declaration order, and a task
//! only starts once every upstream task of the same run has been tracked.
//! Retry and scheduling policy belong to the real orchestrator.

mod tasks;

pub use tasks::{EstimatorConfig, TrainingHyperparameters, TrainingTask, TransformTask};

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rustc_hash::FxHashSet;
use tracing::{error, info, warn};

use crate::correlator::{RunCorrelator, TaskState, TrackedJob};
use crate::{Error, Result};

/// Context of one workflow run, handed to every task.
///
/// Carries the run identity and the outputs of tasks that already finished
/// in this run; downstream tasks read upstream job names from here, never
/// from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    dag_id: String,
    run_id: String,
    logical_date: DateTime<Utc>,
    outputs: BTreeMap<String, TrackedJob>,
}

impl RunContext {
    /// Context for a run with an orchestrator-assigned id.
    #[must_use]
    pub fn new(dag_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            run_id: run_id.into(),
            logical_date: Utc::now(),
            outputs: BTreeMap::new(),
        }
    }

    /// Context for a manually triggered run at `logical_date`.
    ///
    /// The run id follows the orchestrator's `manual__<timestamp>` form.
    #[must_use]
    pub fn manual(dag_id: impl Into<String>, logical_date: DateTime<Utc>) -> Self {
        let run_id = format!(
            "manual__{}",
            logical_date.to_rfc3339_opts(SecondsFormat::Secs, false)
        );
        Self {
            logical_date,
            ..Self::new(dag_id, run_id)
        }
    }

    /// DAG this run belongs to.
    #[must_use]
    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    /// Run identifier, unique per DAG.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Logical date of the run.
    #[must_use]
    pub const fn logical_date(&self) -> DateTime<Utc> {
        self.logical_date
    }

    /// Output of an upstream task in this run.
    ///
    /// # Errors
    ///
    /// [`Error::MissingUpstream`] if `task_id` has not produced an output.
    pub fn upstream_job(&self, task_id: &str) -> Result<&TrackedJob> {
        self.outputs
            .get(task_id)
            .ok_or_else(|| Error::MissingUpstream(task_id.to_string()))
    }

    /// Record a finished task's output.
    pub fn record_output(&mut self, task_id: impl Into<String>, output: TrackedJob) {
        self.outputs.insert(task_id.into(), output);
    }
}

/// One node of a workflow.
pub trait Task {
    /// Unique id of the task within its workflow.
    fn task_id(&self) -> &str;

    /// Tasks that must be tracked before this one starts.
    fn upstream(&self) -> &[String];

    /// Run the task: build its job and submit it through `correlator`.
    ///
    /// # Errors
    ///
    /// Whatever the correlator or upstream lookup reports.
    fn run(
        &self,
        data_location: &str,
        run: &RunContext,
        correlator: &RunCorrelator<'_>,
    ) -> Result<TrackedJob>;
}

/// Result of one workflow run.
#[derive(Debug)]
pub struct RunReport {
    /// Final context, including every task output
    pub context: RunContext,
    /// Final state per task, in declaration order
    pub states: Vec<(String, TaskState)>,
    /// Errors of failed tasks
    pub failures: Vec<(String, Error)>,
}

impl RunReport {
    /// Whether every task was tracked.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
            && self
                .states
                .iter()
                .all(|(_, s)| matches!(s, TaskState::Tracked { .. }))
    }

    /// Final state of a task.
    #[must_use]
    pub fn state(&self, task_id: &str) -> Option<&TaskState> {
        self.states
            .iter()
            .find(|(id, _)| id == task_id)
            .map(|(_, s)| s)
    }
}

/// A small DAG of tasks run in declaration order.
pub struct Workflow {
    dag_id: String,
    tasks: Vec<Box<dyn Task>>,
}

impl Workflow {
    /// Create an empty workflow.
    #[must_use]
    pub fn new(dag_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a task.
    #[must_use]
    pub fn task(mut self, task: impl Task + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// DAG id.
    #[must_use]
    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    /// Check ids are unique and every upstream is declared before its dependents.
    ///
    /// Declaration order is then a topological order, which also rules out cycles.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for task in &self.tasks {
            for up in task.upstream() {
                if !seen.contains(up.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "task '{}' depends on '{up}', which is not declared before it",
                        task.task_id()
                    )));
                }
            }
            if !seen.insert(task.task_id()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate task id '{}'",
                    task.task_id()
                )));
            }
        }
        Ok(())
    }

    /// Run every task once for `run`.
    ///
    /// A failed task does not stop independent tasks; its dependents stay
    /// `Pending`.
    ///
    /// # Errors
    ///
    /// Only validation errors; task failures are reported in the [`RunReport`].
    pub fn run(
        &self,
        mut run: RunContext,
        data_location: &str,
        correlator: &RunCorrelator<'_>,
    ) -> Result<RunReport> {
        self.validate()?;
        info!(dag = %self.dag_id, run = run.run_id(), tasks = self.tasks.len(), "run started");

        let mut states = Vec::with_capacity(self.tasks.len());
        let mut failures = Vec::new();

        for task in &self.tasks {
            let id = task.task_id();
            let ready = task
                .upstream()
                .iter()
                .all(|up| run.upstream_job(up).is_ok());
            if !ready {
                warn!(task = id, "upstream not tracked, skipping");
                states.push((id.to_string(), TaskState::Pending));
                continue;
            }

            let outcome = task.run(data_location, &run, correlator);
            states.push((id.to_string(), TaskState::from_outcome(&outcome)));
            match outcome {
                Ok(job) => run.record_output(id, job),
                Err(e) => {
                    error!(task = id, error = %e, "task failed");
                    failures.push((id.to_string(), e));
                }
            }
        }

        let report = RunReport {
            context: run,
            states,
            failures,
        };
        info!(
            dag = %self.dag_id,
            run = report.context.run_id(),
            succeeded = report.succeeded(),
            "run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{JobHandle, JobKind};
    use chrono::TimeZone;

    struct Stub {
        id: String,
        upstream: Vec<String>,
        fail: bool,
    }

    impl Stub {
        fn new(id: &str, upstream: &[&str], fail: bool) -> Self {
            Self {
                id: id.to_string(),
                upstream: upstream.iter().map(ToString::to_string).collect(),
                fail,
            }
        }
    }

    impl Task for Stub {
        fn task_id(&self) -> &str {
            &self.id
        }

        fn upstream(&self) -> &[String] {
            &self.upstream
        }

        fn run(&self, _: &str, run: &RunContext, _: &RunCorrelator<'_>) -> Result<TrackedJob> {
            if self.fail {
                return Err(Error::SubmitFailed {
                    job_name: self.id.clone(),
                    reason: "stub".into(),
                });
            }
            Ok(TrackedJob {
                handle: JobHandle {
                    job_name: format!("{}-{}", self.id, run.run_id()),
                    job_arn: format!("arn:{}", self.id),
                    kind: JobKind::Training,
                },
                trial_name: "trial".into(),
                trial_component_name: self.id.clone(),
            })
        }
    }

    #[test]
    fn test_manual_run_id() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let run = RunContext::manual("dag", date);
        assert_eq!(run.run_id(), "manual__2024-01-01T00:00:00+00:00");
        assert_eq!(run.logical_date(), date);
    }

    #[test]
    fn test_upstream_job_missing() {
        let run = RunContext::new("dag", "run-1");
        let err = run.upstream_job("training").unwrap_err();
        assert!(matches!(err, Error::MissingUpstream(ref t) if t == "training"));
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let workflow = Workflow::new("dag")
            .task(Stub::new("b", &["a"], false))
            .task(Stub::new("a", &[], false));
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate() {
        let workflow = Workflow::new("dag")
            .task(Stub::new("a", &[], false))
            .task(Stub::new("a", &[], false));
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn test_failed_upstream_leaves_dependent_pending() {
        let ctx = crate::TrackingContext::in_memory();
        let platform = crate::platform::LocalPlatform::new(&ctx);
        let correlator = RunCorrelator::new(&ctx, &platform, "exp");
        let workflow = Workflow::new("dag")
            .task(Stub::new("a", &[], true))
            .task(Stub::new("b", &["a"], false))
            .task(Stub::new("c", &[], false));

        let report = workflow
            .run(RunContext::new("dag", "run-1"), "s3://bucket", &correlator)
            .unwrap();

        assert!(!report.succeeded());
        assert!(matches!(report.state("a"), Some(TaskState::SubmitFailed { .. })));
        assert_eq!(report.state("b"), Some(&TaskState::Pending));
        assert!(matches!(report.state("c"), Some(TaskState::Tracked { .. })));
        assert_eq!(report.failures.len(), 1);
    }
}

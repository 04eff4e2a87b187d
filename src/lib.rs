//! # workflow-trials: Experiment Tracking for Orchestrated ML Workflows
//!
//! **Version**: 0.1.0
//!
//! A small façade that correlates the task runs of an external workflow
//! orchestrator with experiment-tracking records of an ML job platform:
//!
//! - **Experiment Registry Client**: create, load and delete named experiments
//! - **Run Correlator**: submit each task's job with an experiment config so
//!   every job of one workflow run lands as a trial component of one trial
//! - **Execution Lister**: list trials by creation time, tabulate them into
//!   `(Name, Source, CreationTime)`, and build per-component analytics
//! - **Cleanup**: tear an experiment down in dependency order
//!
//! The registry and the job platform are external systems reached through
//! the [`registry::Registry`] and [`platform::JobPlatform`] traits. In-memory
//! stand-ins ([`registry::MemoryRegistry`], [`platform::LocalPlatform`]) ship
//! with the crate.
//!
//! ## Example Usage
//!
//! ```rust
//! use workflow_trials::lister::{tabulate, ExecutionLister};
//! use workflow_trials::platform::LocalPlatform;
//! use workflow_trials::registry::{ExperimentRegistryClient, SortBy, SortOrder};
//! use workflow_trials::workflow::{
//!     EstimatorConfig, RunContext, TrainingHyperparameters, TrainingTask, TransformTask, Workflow,
//! };
//! use workflow_trials::{RunCorrelator, TrackingContext};
//!
//! # fn main() -> workflow_trials::Result<()> {
//! let ctx = TrackingContext::in_memory();
//! ExperimentRegistryClient::new(&ctx).create("mnist", "CNN classifier")?;
//!
//! let platform = LocalPlatform::new(&ctx);
//! let correlator = RunCorrelator::new(&ctx, &platform, "mnist");
//! let estimator = EstimatorConfig::new("pytorch-1.13", "ml.m5.large", "s3://bucket/output");
//! let workflow = Workflow::new("mnist-dag")
//!     .task(TrainingTask::new("training", estimator.clone(), TrainingHyperparameters::default())?)
//!     .task(TransformTask::new("transform", "training", estimator));
//!
//! let report = workflow.run(RunContext::new("mnist-dag", "run-1"), "s3://bucket/data", &correlator)?;
//! assert!(report.succeeded());
//!
//! let trials = ExecutionLister::new(&ctx)
//!     .list_trials("mnist", SortBy::CreationTime, SortOrder::Ascending)
//!     .collect_all()?;
//! assert_eq!(tabulate(&trials)?.num_rows(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cleanup;
pub mod config;
mod context;
pub mod correlator;
pub mod error;
pub mod experiment;
pub mod lister;
pub mod logging;
pub mod platform;
pub mod registry;
pub mod report;
pub mod workflow;

pub use context::TrackingContext;
pub use correlator::{ExperimentConfig, RunCorrelator, TaskState, TrackedJob};
pub use error::{Error, Result};

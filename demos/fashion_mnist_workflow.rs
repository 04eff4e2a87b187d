//! Fashion-MNIST Workflow Example
//!
//! Runs a training → batch transform workflow twice against the local
//! platform, then lists, tabulates and analyses the tracked trials before
//! cleaning the experiment up.
//!
//! Run with: cargo run --example fashion_mnist_workflow
//! Verbose: WORKFLOW_TRIALS_LOG=debug cargo run --example fashion_mnist_workflow

use anyhow::Context;
use workflow_trials::cleanup::cleanup_experiment;
use workflow_trials::config::TrackingConfig;
use workflow_trials::experiment::ParameterValue;
use workflow_trials::lister::{tabulate, ExecutionLister};
use workflow_trials::logging::init_tracing;
use workflow_trials::platform::{JobExecutor, JobKind, JobOutcome, JobSpec, LocalPlatform, NoopExecutor};
use workflow_trials::registry::{ExperimentRegistryClient, SortBy, SortOrder};
use workflow_trials::report::pretty;
use workflow_trials::workflow::{
    EstimatorConfig, RunContext, TrainingHyperparameters, TrainingTask, TransformTask, Workflow,
};
use workflow_trials::{RunCorrelator, TrackingContext};

const EXPERIMENT: &str = "fashion-mnist-classification-experiment";
const DATA: &str = "s3://sagemaker-us-east-1-000000000000/fashion-mnist";

/// Training emits a decaying loss and rising accuracy per epoch.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn simulated_job(spec: &JobSpec) -> JobOutcome {
    let outcome = NoopExecutor.execute(spec);
    if spec.kind != JobKind::Training {
        return outcome;
    }

    let epochs = spec
        .hyperparameters
        .get("epochs")
        .and_then(ParameterValue::as_f64)
        .unwrap_or(1.0) as u64;
    (0..epochs).fold(outcome, |outcome, epoch| {
        let t = (epoch + 1) as f64;
        outcome
            .metric("train:loss", epoch, 2.3 / t)
            .metric("validation:accuracy", epoch, 0.92 - 0.4 / t)
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing(tracing::Level::INFO)?;
    println!("=== Fashion-MNIST Workflow Tracking ===\n");

    let mut config = TrackingConfig::from_env().context("loading configuration")?;
    config.cleanup.delete_delay_ms = 100;
    let ctx = TrackingContext::in_memory().with_config(config)?;

    // -------------------------------------------------------------------------
    // 1. Experiment
    // -------------------------------------------------------------------------
    let experiment = ExperimentRegistryClient::new(&ctx)
        .create_or_load(EXPERIMENT, "Classify Fashion-MNIST images with a CNN")?;
    println!("1. Experiment: {} ({})", experiment.name(), experiment.description());

    // -------------------------------------------------------------------------
    // 2. Two workflow runs
    // -------------------------------------------------------------------------
    let platform = LocalPlatform::new(&ctx).with_executor(simulated_job);
    let correlator = RunCorrelator::new(&ctx, &platform, EXPERIMENT);
    let estimator = EstimatorConfig::new(
        "pytorch-training:1.13-cpu-py39",
        "ml.c5.xlarge",
        "s3://sagemaker-us-east-1-000000000000/output",
    );
    let workflow = Workflow::new("fashion-mnist-dag")
        .task(TrainingTask::new(
            "training",
            estimator.clone(),
            TrainingHyperparameters {
                epochs: 5,
                ..TrainingHyperparameters::default()
            },
        )?)
        .task(TransformTask::new("transform", "training", estimator));

    println!("\n2. Running workflow...");
    for run_id in ["scheduled-run-1", "scheduled-run-2"] {
        let report = workflow.run(RunContext::new(workflow.dag_id(), run_id), DATA, &correlator)?;
        for (task, state) in &report.states {
            println!("   {run_id} / {task}: {state:?}");
        }
        anyhow::ensure!(report.succeeded(), "run {run_id} failed: {:?}", report.failures);
    }

    // -------------------------------------------------------------------------
    // 3. Trials
    // -------------------------------------------------------------------------
    let lister = ExecutionLister::new(&ctx);
    let trials = lister
        .list_trials(EXPERIMENT, SortBy::CreationTime, SortOrder::Descending)
        .collect_all()?;
    println!("\n3. Trials (newest first):");
    println!("{}", pretty(&[tabulate(&trials)?])?);

    // -------------------------------------------------------------------------
    // 4. Analytics
    // -------------------------------------------------------------------------
    let analytics = lister.analytics(EXPERIMENT, SortBy::CreationTime, SortOrder::Ascending)?;
    println!(
        "\n4. Analytics: {} components x {} columns",
        analytics.num_rows(),
        analytics.num_columns()
    );
    let summary = analytics.project(&[
        analytics.schema().index_of("DisplayName")?,
        analytics.schema().index_of("Status")?,
        analytics.schema().index_of("train:loss - Last")?,
        analytics.schema().index_of("validation:accuracy - Max")?,
    ])?;
    println!("{}", pretty(&[summary])?);

    // -------------------------------------------------------------------------
    // 5. Cleanup
    // -------------------------------------------------------------------------
    let report = cleanup_experiment(&ctx, EXPERIMENT)?;
    println!(
        "\n5. Cleanup: {} trials, {} components deleted ({} skipped)",
        report.trials_deleted, report.components_deleted, report.components_skipped
    );

    Ok(())
}

//! Cleanup procedure tests

use workflow_trials::cleanup::{cleanup_experiment, CleanupReport};
use workflow_trials::config::TrackingConfig;
use workflow_trials::error::EntityKind;
use workflow_trials::platform::LocalPlatform;
use workflow_trials::registry::ExperimentRegistryClient;
use workflow_trials::workflow::{
    EstimatorConfig, RunContext, TrainingHyperparameters, TrainingTask, TransformTask, Workflow,
};
use workflow_trials::{RunCorrelator, TrackingContext};

fn context() -> TrackingContext {
    let mut config = TrackingConfig::default();
    config.cleanup.delete_delay_ms = 0;
    TrackingContext::in_memory().with_config(config).unwrap()
}

fn run_workflow(ctx: &TrackingContext, platform: &LocalPlatform, runs: &[&str]) {
    let estimator = EstimatorConfig::new("pytorch", "ml.m5.large", "s3://bucket/out");
    let workflow = Workflow::new("dag")
        .task(TrainingTask::new("training", estimator.clone(), TrainingHyperparameters::default()).unwrap())
        .task(TransformTask::new("transform", "training", estimator));
    let correlator = RunCorrelator::new(ctx, platform, "exp");
    for run in runs {
        let report = workflow
            .run(RunContext::new("dag", *run), "s3://bucket/data", &correlator)
            .unwrap();
        assert!(report.succeeded());
    }
}

#[test]
fn test_cleanup_after_workflow_runs() {
    let ctx = context();
    ExperimentRegistryClient::new(&ctx).create("exp", "").unwrap();
    let platform = LocalPlatform::new(&ctx);
    run_workflow(&ctx, &platform, &["run-1", "run-2"]);

    let report = cleanup_experiment(&ctx, "exp").unwrap();
    assert_eq!(
        report,
        CleanupReport {
            trials_deleted: 2,
            components_deleted: 4,
            components_skipped: 0,
        }
    );

    // External jobs are untouched.
    assert_eq!(platform.job_count(), 4);
    assert!(ExperimentRegistryClient::new(&ctx)
        .load("exp")
        .unwrap_err()
        .is_not_found(EntityKind::Experiment));
}

#[test]
fn test_second_cleanup_is_not_found() {
    let ctx = context();
    ExperimentRegistryClient::new(&ctx).create("exp", "").unwrap();
    let platform = LocalPlatform::new(&ctx);
    run_workflow(&ctx, &platform, &["run-1"]);

    cleanup_experiment(&ctx, "exp").unwrap();
    let err = cleanup_experiment(&ctx, "exp").unwrap_err();
    assert!(err.is_not_found(EntityKind::Experiment));
}

#[test]
fn test_experiment_name_reusable_after_cleanup() {
    let ctx = context();
    let client = ExperimentRegistryClient::new(&ctx);
    client.create("exp", "first").unwrap();
    let platform = LocalPlatform::new(&ctx);
    run_workflow(&ctx, &platform, &["run-1"]);

    cleanup_experiment(&ctx, "exp").unwrap();
    let again = client.create("exp", "second").unwrap();
    assert_eq!(again.description(), "second");
}

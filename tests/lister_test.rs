//! Execution lister tests

use arrow::array::{Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{Duration, TimeZone, Utc};
use workflow_trials::config::TrackingConfig;
use workflow_trials::error::EntityKind;
use workflow_trials::experiment::{ExperimentRecord, TrialRecord, TrialSource};
use workflow_trials::lister::{tabulate, trial_table_schema, ExecutionLister, TrialSummary};
use workflow_trials::registry::{SortBy, SortOrder};
use workflow_trials::report::{load_parquet, pretty, write_parquet};
use workflow_trials::TrackingContext;

fn seeded(page_size: usize) -> TrackingContext {
    let mut config = TrackingConfig::default();
    config.listing.page_size = page_size;
    let ctx = TrackingContext::in_memory().with_config(config).unwrap();

    let registry = ctx.registry();
    registry
        .create_experiment(ExperimentRecord::new("exp", ""))
        .unwrap();
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    // Created out of name order so the two sort keys disagree.
    for (i, name) in ["trial-c", "trial-a", "trial-b"].iter().enumerate() {
        registry
            .create_trial(
                TrialRecord::builder(*name, "exp")
                    .source(TrialSource::new(
                        format!("arn:aws:sagemaker:us-east-1:000000000000:training-job/{name}"),
                        Some("SageMakerTrainingJob".into()),
                    ))
                    .created_at(base + Duration::seconds(i64::try_from(i).unwrap()))
                    .build(),
            )
            .unwrap();
    }
    ctx
}

fn names(trials: &[TrialSummary]) -> Vec<&str> {
    trials.iter().map(|t| t.trial_name.as_str()).collect()
}

// =============================================================================
// list_trials
// =============================================================================

#[test]
fn test_sorted_by_creation_time() {
    let ctx = seeded(100);
    let lister = ExecutionLister::new(&ctx);

    let asc = lister
        .list_trials("exp", SortBy::CreationTime, SortOrder::Ascending)
        .collect_all()
        .unwrap();
    assert_eq!(names(&asc), ["trial-c", "trial-a", "trial-b"]);

    let desc = lister
        .list_trials("exp", SortBy::CreationTime, SortOrder::Descending)
        .collect_all()
        .unwrap();
    assert_eq!(names(&desc), ["trial-b", "trial-a", "trial-c"]);
}

#[test]
fn test_sorted_by_name_across_pages() {
    let ctx = seeded(1);
    let trials = ExecutionLister::new(&ctx)
        .list_trials("exp", SortBy::Name, SortOrder::Ascending)
        .collect_all()
        .unwrap();
    assert_eq!(names(&trials), ["trial-a", "trial-b", "trial-c"]);
}

#[test]
fn test_unknown_experiment() {
    let ctx = TrackingContext::in_memory();
    let err = ExecutionLister::new(&ctx)
        .list_trials("missing", SortBy::CreationTime, SortOrder::Ascending)
        .collect_all()
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Experiment));

    let err = ExecutionLister::new(&ctx)
        .analytics("missing", SortBy::CreationTime, SortOrder::Ascending)
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Experiment));
}

// =============================================================================
// tabulate
// =============================================================================

#[test]
fn test_tabulate_schema_and_values() {
    let ctx = seeded(100);
    let trials = ExecutionLister::new(&ctx)
        .list_trials("exp", SortBy::CreationTime, SortOrder::Ascending)
        .collect_all()
        .unwrap();
    let table = tabulate(&trials).unwrap();

    assert_eq!(table.schema(), trial_table_schema());
    assert_eq!(
        table.schema().field(2).data_type(),
        &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
    );
    assert_eq!(table.num_rows(), trials.len());

    let sources = table
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    for (i, trial) in trials.iter().enumerate() {
        assert_eq!(Some(sources.value(i)), trial.source.as_deref());
    }

    let times = table
        .column(2)
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap();
    assert!(times.value(0) < times.value(1));
    assert_eq!(times.null_count(), 0);
}

#[test]
fn test_tabulate_export_round_trip() {
    let ctx = seeded(100);
    let trials = ExecutionLister::new(&ctx)
        .list_trials("exp", SortBy::Name, SortOrder::Ascending)
        .collect_all()
        .unwrap();
    let table = tabulate(&trials).unwrap();

    let path = std::env::temp_dir().join("workflow_trials_lister_test.parquet");
    write_parquet(&table, &path).unwrap();
    let loaded = load_parquet(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
    let text = pretty(&loaded).unwrap();
    assert!(text.contains("trial-a"));
    assert!(text.contains("CreationTime"));
}

//! Property-based tests for workflow-trials
//!
//! - Registry create/load round trips
//! - Tabulation preserves row count and sources
//! - Listing order holds for any creation order and page size
//! - Generated job names are always valid platform names
//! - Run with ProptestConfig::with_cases(100)

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use workflow_trials::config::TrackingConfig;
use workflow_trials::error::EntityKind;
use workflow_trials::experiment::{validate_name, TrialRecord, MAX_JOB_NAME_LEN};
use workflow_trials::lister::{tabulate, ExecutionLister, TrialSummary};
use workflow_trials::registry::{ExperimentRegistryClient, SortBy, SortOrder};
use workflow_trials::workflow::RunContext;
use workflow_trials::{RunCorrelator, TrackingContext};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Valid registry name
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{0,40}"
}

/// Trial summary with an optional source
fn arb_summary() -> impl Strategy<Value = TrialSummary> {
    (arb_name(), proptest::option::of("arn:[a-z0-9:/-]{1,60}"), 0i64..1_000_000).prop_map(
        |(trial_name, source, offset)| TrialSummary {
            trial_name,
            source,
            creation_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(offset),
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a created experiment loads back with the same description
    #[test]
    fn prop_create_load_round_trip(name in arb_name(), description in ".{0,80}") {
        let ctx = TrackingContext::in_memory();
        let client = ExperimentRegistryClient::new(&ctx);

        client.create(&name, &description).unwrap();
        let loaded = client.load(&name).unwrap();
        prop_assert_eq!(loaded.name(), name.as_str());
        prop_assert_eq!(loaded.description(), description.as_str());
    }

    /// Property: tabulate yields one row per trial and copies sources verbatim
    #[test]
    fn prop_tabulate_preserves_rows(trials in proptest::collection::vec(arb_summary(), 0..50)) {
        use arrow::array::{Array, StringArray};

        let table = tabulate(&trials).unwrap();
        prop_assert_eq!(table.num_rows(), trials.len());

        let sources = table.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        for (i, trial) in trials.iter().enumerate() {
            match &trial.source {
                Some(s) => prop_assert_eq!(sources.value(i), s.as_str()),
                None => prop_assert!(sources.is_null(i)),
            }
        }
    }

    /// Property: listing by creation time is sorted for any page size
    #[test]
    fn prop_listing_sorted(
        offsets in proptest::collection::vec(0i64..10_000, 1..30),
        page_size in 1usize..=100,
        descending in any::<bool>(),
    ) {
        let mut config = TrackingConfig::default();
        config.listing.page_size = page_size;
        let ctx = TrackingContext::in_memory().with_config(config).unwrap();
        ExperimentRegistryClient::new(&ctx).create("exp", "").unwrap();

        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        for (i, offset) in offsets.iter().enumerate() {
            ctx.registry()
                .create_trial(
                    TrialRecord::builder(format!("trial-{i}"), "exp")
                        .created_at(base + Duration::seconds(*offset))
                        .build(),
                )
                .unwrap();
        }

        let order = if descending { SortOrder::Descending } else { SortOrder::Ascending };
        let trials = ExecutionLister::new(&ctx)
            .list_trials("exp", SortBy::CreationTime, order)
            .collect_all()
            .unwrap();

        prop_assert_eq!(trials.len(), offsets.len());
        for pair in trials.windows(2) {
            if descending {
                prop_assert!(pair[0].creation_time >= pair[1].creation_time);
            } else {
                prop_assert!(pair[0].creation_time <= pair[1].creation_time);
            }
        }
    }

    /// Property: generated job names are valid, bounded and deterministic
    #[test]
    fn prop_job_names_valid(task in "[a-z][a-z_]{0,30}", run_id in ".{1,120}") {
        let run = RunContext::new("dag", run_id.clone());
        let name = RunCorrelator::job_name(&run, &task);

        prop_assert!(name.len() <= MAX_JOB_NAME_LEN);
        prop_assert!(validate_name(EntityKind::Job, &name, MAX_JOB_NAME_LEN).is_ok());
        prop_assert_eq!(name, RunCorrelator::job_name(&RunContext::new("dag", run_id), &task));
    }
}

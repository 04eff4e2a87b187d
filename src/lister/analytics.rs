//! Per-component analytics table
//!
//! One row per trial component of an experiment. Fixed columns come first,
//! then one column per parameter, six per metric, and one per artifact:
//!
//! ```text
//! TrialComponentName | DisplayName | SourceArn | Status | CreationTime | Trials | Experiments
//! | <param>... | <metric> - Min | - Max | - Avg | - StdDev | - Last | - Count ... | <artifact> - Value ...
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::experiment::{MetricRecord, MetricSummary, ParameterValue, TrialComponentRecord};
use crate::registry::{ComponentFilter, PageRequest, SortBy, SortOrder};
use crate::{Result, TrackingContext};

/// Builder for an analytics query.
///
/// # Example
///
/// ```rust
/// use workflow_trials::lister::AnalyticsQuery;
/// use workflow_trials::registry::{ExperimentRegistryClient, SortOrder};
/// use workflow_trials::TrackingContext;
///
/// # fn main() -> workflow_trials::Result<()> {
/// let ctx = TrackingContext::in_memory();
/// ExperimentRegistryClient::new(&ctx).create("exp", "demo")?;
///
/// let table = AnalyticsQuery::new("exp")
///     .order(SortOrder::Descending)
///     .metric_names(["loss"])
///     .run(&ctx)?;
/// assert_eq!(table.num_rows(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    experiment_name: String,
    sort_by: SortBy,
    order: SortOrder,
    parameter_names: Option<BTreeSet<String>>,
    metric_names: Option<BTreeSet<String>>,
}

/// One component with its metric statistics by key.
struct Row {
    component: TrialComponentRecord,
    metrics: FxHashMap<String, MetricSummary>,
}

impl AnalyticsQuery {
    /// Query every component of `experiment_name`, oldest first.
    #[must_use]
    pub fn new(experiment_name: impl Into<String>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            sort_by: SortBy::CreationTime,
            order: SortOrder::Ascending,
            parameter_names: None,
            metric_names: None,
        }
    }

    /// Set the sort key.
    #[must_use]
    pub const fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Set the sort direction.
    #[must_use]
    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Only include these parameter columns.
    #[must_use]
    pub fn parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Only include these metrics.
    #[must_use]
    pub fn metric_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Run the query against the registry.
    ///
    /// # Errors
    ///
    /// `NotFound` if the experiment is absent; any registry or Arrow error.
    pub fn run(&self, ctx: &TrackingContext) -> Result<RecordBatch> {
        let rows = self.fetch_rows(ctx)?;
        debug!(experiment = %self.experiment_name, rows = rows.len(), "analytics fetched");
        self.build_table(&rows)
    }

    fn fetch_rows(&self, ctx: &TrackingContext) -> Result<Vec<Row>> {
        let registry = ctx.registry();
        registry.get_experiment(&self.experiment_name)?;

        let filter = ComponentFilter::Experiment(self.experiment_name.clone());
        let mut page = PageRequest::first(ctx.config().listing.page_size);
        let mut rows = Vec::new();
        loop {
            let result = registry.list_trial_components(&filter, self.sort_by, self.order, &page)?;
            for component in result.items {
                let metrics = summarize(&registry.get_metrics(component.name())?);
                rows.push(Row { component, metrics });
            }
            match result.next_token {
                Some(token) => page.next_token = Some(token),
                None => break,
            }
        }
        Ok(rows)
    }

    fn wanted(filter: Option<&BTreeSet<String>>, name: &str) -> bool {
        filter.map_or(true, |f| f.contains(name))
    }

    fn build_table(&self, rows: &[Row]) -> Result<RecordBatch> {
        let mut fields = Vec::new();
        let mut columns: Vec<ArrayRef> = Vec::new();

        let mut push = |field: Field, column: ArrayRef| {
            fields.push(field);
            columns.push(column);
        };

        push(
            Field::new("TrialComponentName", DataType::Utf8, false),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.component.name()),
            )),
        );
        push(
            Field::new("DisplayName", DataType::Utf8, false),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.component.display_name()),
            )),
        );
        push(
            Field::new("SourceArn", DataType::Utf8, true),
            Arc::new(
                rows.iter()
                    .map(|r| r.component.source().map(|s| s.source_arn.as_str()))
                    .collect::<StringArray>(),
            ),
        );
        push(
            Field::new("Status", DataType::Utf8, false),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.component.status().to_string()),
            )),
        );
        push(
            Field::new(
                "CreationTime",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Arc::new(
                TimestampMillisecondArray::from_iter_values(
                    rows.iter().map(|r| r.component.created_at().timestamp_millis()),
                )
                .with_timezone("UTC"),
            ),
        );
        push(
            Field::new("Trials", DataType::Utf8, true),
            Arc::new(
                rows.iter()
                    .map(|r| r.component.trial_name())
                    .collect::<StringArray>(),
            ),
        );
        push(
            Field::new("Experiments", DataType::Utf8, false),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|_| self.experiment_name.as_str()),
            )),
        );

        // Parameters: Float64 when every present value is numeric.
        let parameter_names: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.component.parameters().keys().map(String::as_str))
            .filter(|name| Self::wanted(self.parameter_names.as_ref(), name))
            .collect();
        for name in parameter_names {
            let values: Vec<Option<&ParameterValue>> =
                rows.iter().map(|r| r.component.parameters().get(name)).collect();
            let numeric = values.iter().flatten().all(|v| v.as_f64().is_some());
            if numeric {
                push(
                    Field::new(name, DataType::Float64, true),
                    Arc::new(
                        values
                            .iter()
                            .map(|v| v.and_then(ParameterValue::as_f64))
                            .collect::<Float64Array>(),
                    ),
                );
            } else {
                push(
                    Field::new(name, DataType::Utf8, true),
                    Arc::new(
                        values
                            .iter()
                            .map(|v| v.map(ToString::to_string))
                            .collect::<StringArray>(),
                    ),
                );
            }
        }

        let metric_keys: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.metrics.keys().map(String::as_str))
            .filter(|key| Self::wanted(self.metric_names.as_ref(), key))
            .collect();
        for key in metric_keys {
            let stats: Vec<Option<&MetricSummary>> =
                rows.iter().map(|r| r.metrics.get(key)).collect();
            let stat_columns: [(&str, fn(&MetricSummary) -> f64); 5] = [
                ("Min", |s| s.min),
                ("Max", |s| s.max),
                ("Avg", |s| s.avg),
                ("StdDev", |s| s.std_dev),
                ("Last", |s| s.last),
            ];
            for (suffix, get) in stat_columns {
                push(
                    Field::new(format!("{key} - {suffix}"), DataType::Float64, true),
                    Arc::new(stats.iter().map(|s| s.map(get)).collect::<Float64Array>()),
                );
            }
            push(
                Field::new(format!("{key} - Count"), DataType::UInt64, true),
                Arc::new(stats.iter().map(|s| s.map(|s| s.count)).collect::<UInt64Array>()),
            );
        }

        let artifact_names: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| {
                r.component
                    .input_artifacts()
                    .keys()
                    .chain(r.component.output_artifacts().keys())
                    .map(String::as_str)
            })
            .collect();
        for name in artifact_names {
            push(
                Field::new(format!("{name} - Value"), DataType::Utf8, true),
                Arc::new(
                    rows.iter()
                        .map(|r| {
                            r.component
                                .output_artifacts()
                                .get(name)
                                .or_else(|| r.component.input_artifacts().get(name))
                                .map(|a| a.value())
                        })
                        .collect::<StringArray>(),
                ),
            );
        }

        Ok(RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns,
        )?)
    }
}

/// Group a component's metric points by key and summarize each series.
fn summarize(points: &[MetricRecord]) -> FxHashMap<String, MetricSummary> {
    let mut by_key: FxHashMap<&str, Vec<&MetricRecord>> = FxHashMap::default();
    for point in points {
        by_key.entry(point.key()).or_default().push(point);
    }
    by_key
        .into_iter()
        .filter_map(|(key, series)| {
            MetricSummary::from_series(series).map(|summary| (key.to_string(), summary))
        })
        .collect()
}

//! Flat trial table

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use super::TrialSummary;
use crate::Result;

/// Schema of [`tabulate`] output: `Name`, `Source`, `CreationTime`.
#[must_use]
pub fn trial_table_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("Name", DataType::Utf8, false),
        Field::new("Source", DataType::Utf8, true),
        Field::new(
            "CreationTime",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
    ]))
}

/// Flatten trial summaries into one row each, in input order.
///
/// Pure: no registry access. `Source` is copied verbatim and is null for
/// trials that were not created by a job.
///
/// # Example
///
/// ```rust
/// use workflow_trials::lister::{tabulate, TrialSummary};
///
/// # fn main() -> workflow_trials::Result<()> {
/// let trials = vec![TrialSummary {
///     trial_name: "exp-run-1".into(),
///     source: Some("arn:aws:sagemaker:us-east-1:000000000000:training-job/train".into()),
///     creation_time: chrono::Utc::now(),
/// }];
/// let table = tabulate(&trials)?;
/// assert_eq!(table.num_rows(), 1);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns error only if Arrow rejects the assembled columns.
pub fn tabulate(trials: &[TrialSummary]) -> Result<RecordBatch> {
    let names = StringArray::from_iter_values(trials.iter().map(|t| t.trial_name.as_str()));
    let sources: StringArray = trials.iter().map(|t| t.source.as_deref()).collect();
    let times = TimestampMillisecondArray::from_iter_values(
        trials.iter().map(|t| t.creation_time.timestamp_millis()),
    )
    .with_timezone("UTC");

    let columns: Vec<ArrayRef> = vec![Arc::new(names), Arc::new(sources), Arc::new(times)];
    Ok(RecordBatch::try_new(trial_table_schema(), columns)?)
}

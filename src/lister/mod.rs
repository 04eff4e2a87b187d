//! Execution Lister
//!
//! Read-only views over the trials of an experiment:
//!
//! - [`ExecutionLister::list_trials`]: lazy, restartable sequence of [`TrialSummary`]
//! - [`tabulate`]: `(Name, Source, CreationTime)` Arrow table, no I/O
//! - [`ExecutionLister::analytics`]: one row per trial component with
//!   parameters, metric statistics and artifacts
//!
//! Nothing is cached: every iteration and every analytics call re-queries
//! the registry, because job metrics may still be arriving.

mod analytics;
mod table;

pub use analytics::AnalyticsQuery;
pub use table::{tabulate, trial_table_schema};

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::experiment::TrialRecord;
use crate::registry::{PageRequest, SortBy, SortOrder};
use crate::{Result, TrackingContext};

/// One listed trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSummary {
    /// Trial name
    pub trial_name: String,
    /// Source reference of the job that created the trial, verbatim
    pub source: Option<String>,
    /// Creation time
    pub creation_time: DateTime<Utc>,
}

impl From<&TrialRecord> for TrialSummary {
    fn from(trial: &TrialRecord) -> Self {
        Self {
            trial_name: trial.name().to_string(),
            source: trial.source().map(|s| s.source_arn.clone()),
            creation_time: trial.created_at(),
        }
    }
}

/// Lists and tabulates trials of experiments.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLister<'a> {
    ctx: &'a TrackingContext,
}

impl<'a> ExecutionLister<'a> {
    /// Create a lister over `ctx`.
    #[must_use]
    pub const fn new(ctx: &'a TrackingContext) -> Self {
        Self { ctx }
    }

    /// Trials of `experiment_name`, sorted.
    ///
    /// Nothing is fetched until the listing is iterated; each iteration
    /// starts over from the first page.
    #[must_use]
    pub fn list_trials(
        &self,
        experiment_name: &str,
        sort_by: SortBy,
        order: SortOrder,
    ) -> TrialListing<'a> {
        TrialListing {
            ctx: self.ctx,
            experiment_name: experiment_name.to_string(),
            sort_by,
            order,
        }
    }

    /// Per-component analytics table for `experiment_name`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the experiment is absent; Arrow errors building the table.
    pub fn analytics(
        &self,
        experiment_name: &str,
        sort_by: SortBy,
        order: SortOrder,
    ) -> Result<arrow::record_batch::RecordBatch> {
        AnalyticsQuery::new(experiment_name)
            .sort_by(sort_by)
            .order(order)
            .run(self.ctx)
    }
}

/// A restartable listing of trials.
#[derive(Debug, Clone)]
pub struct TrialListing<'a> {
    ctx: &'a TrackingContext,
    experiment_name: String,
    sort_by: SortBy,
    order: SortOrder,
}

impl<'a> TrialListing<'a> {
    /// Start a fresh pass over the registry.
    #[must_use]
    pub fn iter(&self) -> TrialSummaries<'a> {
        TrialSummaries {
            ctx: self.ctx,
            experiment_name: self.experiment_name.clone(),
            sort_by: self.sort_by,
            order: self.order,
            buffer: VecDeque::new(),
            next_token: None,
            exhausted: false,
        }
    }

    /// Collect a full pass.
    ///
    /// # Errors
    ///
    /// The first registry error of the pass.
    pub fn collect_all(&self) -> Result<Vec<TrialSummary>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &TrialListing<'a> {
    type Item = Result<TrialSummary>;
    type IntoIter = TrialSummaries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`TrialListing`], fetching a page at a time.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct TrialSummaries<'a> {
    ctx: &'a TrackingContext,
    experiment_name: String,
    sort_by: SortBy,
    order: SortOrder,
    buffer: VecDeque<TrialSummary>,
    next_token: Option<String>,
    exhausted: bool,
}

impl TrialSummaries<'_> {
    fn fetch_page(&mut self) -> Result<()> {
        let page = PageRequest {
            next_token: self.next_token.take(),
            max_results: self.ctx.config().listing.page_size,
        };
        let page = self.ctx.registry().list_trials(
            &self.experiment_name,
            self.sort_by,
            self.order,
            &page,
        )?;
        debug!(
            experiment = %self.experiment_name,
            trials = page.items.len(),
            more = page.next_token.is_some(),
            "fetched trial page"
        );

        self.buffer.extend(page.items.iter().map(TrialSummary::from));
        self.exhausted = page.next_token.is_none();
        self.next_token = page.next_token;
        Ok(())
    }
}

impl Iterator for TrialSummaries<'_> {
    type Item = Result<TrialSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

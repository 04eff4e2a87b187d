//! Registry seam: the external persistent store of tracking records.
//!
//! The [`Registry`] trait mirrors the CRUD surface of a managed experiment
//! registry. Every call is a synchronous round trip; implementations must
//! enforce name uniqueness and the reference constraints themselves, since
//! the façade never locks records.
//!
//! # Example
//!
//! ```rust
//! use workflow_trials::experiment::ExperimentRecord;
//! use workflow_trials::registry::{MemoryRegistry, Registry};
//!
//! # fn example() -> workflow_trials::Result<()> {
//! let registry = MemoryRegistry::new();
//! registry.create_experiment(ExperimentRecord::new("exp", "demo"))?;
//! assert_eq!(registry.get_experiment("exp")?.description(), "demo");
//!
//! registry.delete_experiment("exp")?;
//! assert!(registry.get_experiment("exp").is_err());
//! # Ok(())
//! # }
//! ```

mod client;
mod memory;

pub use client::ExperimentRegistryClient;
pub use memory::MemoryRegistry;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::experiment::{ExperimentRecord, MetricRecord, TrialComponentRecord, TrialRecord};
use crate::Result;

/// Sort key for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    /// Record creation time
    #[default]
    CreationTime,
    /// Record name
    Name,
}

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest / smallest first
    #[default]
    Ascending,
    /// Newest / largest first
    Descending,
}

impl SortOrder {
    /// Apply this direction to an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Compare two records by `sort_by`/`order`, breaking ties by name ascending.
#[must_use]
pub fn compare_records(
    (a_name, a_time): (&str, DateTime<Utc>),
    (b_name, b_time): (&str, DateTime<Utc>),
    sort_by: SortBy,
    order: SortOrder,
) -> Ordering {
    let primary = match sort_by {
        SortBy::CreationTime => order.apply(a_time.cmp(&b_time)),
        SortBy::Name => order.apply(a_name.cmp(b_name)),
    };
    primary.then_with(|| a_name.cmp(b_name))
}

/// One page of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Continuation token returned by the previous page, `None` for the first page
    pub next_token: Option<String>,
    /// Maximum items to return
    pub max_results: usize,
}

impl PageRequest {
    /// Request the first page.
    #[must_use]
    pub const fn first(max_results: usize) -> Self {
        Self {
            next_token: None,
            max_results,
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Token for the following page, `None` on the last page
    pub next_token: Option<String>,
}

/// Which trial components a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentFilter {
    /// Components associated with one trial
    Trial(String),
    /// Components associated with any trial of one experiment
    Experiment(String),
}

/// External experiment registry.
///
/// Implementations are shared across concurrent workflow runs and cleanups,
/// so every method takes `&self`.
pub trait Registry: Send + Sync {
    /// Create an experiment.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken.
    fn create_experiment(&self, experiment: ExperimentRecord) -> Result<()>;

    /// Fetch an experiment by name.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    fn get_experiment(&self, name: &str) -> Result<ExperimentRecord>;

    /// Delete an experiment.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `HasDependents` while any trial references it.
    fn delete_experiment(&self, name: &str) -> Result<()>;

    /// Create a trial under an existing experiment.
    ///
    /// # Errors
    ///
    /// `NotFound` if the experiment is absent, `AlreadyExists` if the trial name is taken.
    fn create_trial(&self, trial: TrialRecord) -> Result<()>;

    /// Fetch a trial by name.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    fn get_trial(&self, name: &str) -> Result<TrialRecord>;

    /// List the trials of an experiment, sorted, one page at a time.
    ///
    /// # Errors
    ///
    /// `NotFound` if the experiment is absent.
    fn list_trials(
        &self,
        experiment_name: &str,
        sort_by: SortBy,
        order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<TrialRecord>>;

    /// Delete a trial.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `HasDependents` while any component is associated.
    fn delete_trial(&self, name: &str) -> Result<()>;

    /// Create an unassociated trial component.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken.
    fn create_trial_component(&self, component: TrialComponentRecord) -> Result<()>;

    /// Fetch a trial component by name.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    fn get_trial_component(&self, name: &str) -> Result<TrialComponentRecord>;

    /// Replace the status, timestamps and artifacts of an existing component.
    ///
    /// The trial association is not changed by this call.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    fn update_trial_component(&self, component: TrialComponentRecord) -> Result<()>;

    /// Find the component recorded for an external job.
    ///
    /// # Errors
    ///
    /// Only transport-level errors; absence is `Ok(None)`.
    fn find_trial_component_by_source(
        &self,
        source_arn: &str,
    ) -> Result<Option<TrialComponentRecord>>;

    /// List trial components, sorted, one page at a time.
    ///
    /// # Errors
    ///
    /// `NotFound` if the filtered trial or experiment is absent.
    fn list_trial_components(
        &self,
        filter: &ComponentFilter,
        sort_by: SortBy,
        order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<TrialComponentRecord>>;

    /// Associate a component with a trial.
    ///
    /// Re-associating with the same trial is a no-op.
    ///
    /// # Errors
    ///
    /// `NotFound` if either record is absent, `AssociatedElsewhere` if the
    /// component belongs to another trial.
    fn associate_trial_component(&self, component_name: &str, trial_name: &str) -> Result<()>;

    /// Remove a component's association with a trial.
    ///
    /// # Errors
    ///
    /// `NotFound` if the component is absent or not associated with `trial_name`.
    fn disassociate_trial_component(&self, component_name: &str, trial_name: &str)
        -> Result<()>;

    /// Delete a trial component record. The external job is not touched.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `AssociatedElsewhere` while associated with a trial.
    fn delete_trial_component(&self, name: &str) -> Result<()>;

    /// Append metric data points to a component.
    ///
    /// # Errors
    ///
    /// `NotFound` if the component is absent.
    fn log_metrics(&self, component_name: &str, metrics: Vec<MetricRecord>) -> Result<()>;

    /// All metric data points of a component, ordered by key then step.
    ///
    /// # Errors
    ///
    /// `NotFound` if the component is absent.
    fn get_metrics(&self, component_name: &str) -> Result<Vec<MetricRecord>>;
}

/// Cut a sorted listing into the page described by `page`.
///
/// Tokens are decimal offsets into the sorted listing.
pub(crate) fn paginate<T>(mut items: Vec<T>, page: &PageRequest) -> Result<Page<T>> {
    let offset = match page.next_token.as_deref() {
        None => 0,
        Some(token) => token.parse::<usize>().map_err(|_| {
            crate::Error::InvalidInput(format!("malformed page token '{token}'"))
        })?,
    };
    let max = page.max_results.max(1);
    let total = items.len();
    let start = offset.min(total);
    let end = start.saturating_add(max).min(total);
    let items: Vec<T> = items.drain(start..end).collect();
    let next_token = (end < total).then(|| end.to_string());
    Ok(Page { items, next_token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sort_order_apply() {
        assert_eq!(SortOrder::Ascending.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortOrder::Descending.apply(Ordering::Less), Ordering::Greater);
    }

    #[test]
    fn test_compare_records_ties_broken_by_name() {
        let t = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let ord = compare_records(("b", t), ("a", t), SortBy::CreationTime, SortOrder::Descending);
        assert_eq!(ord, Ordering::Greater);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (0..5).collect();
        let first = paginate(items.clone(), &PageRequest::first(2)).unwrap();
        assert_eq!(first.items, vec![0, 1]);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let last = paginate(
            items,
            &PageRequest {
                next_token: Some("4".into()),
                max_results: 2,
            },
        )
        .unwrap();
        assert_eq!(last.items, vec![4]);
        assert!(last.next_token.is_none());
    }

    #[test]
    fn test_paginate_rejects_bad_token() {
        let page = PageRequest {
            next_token: Some("abc".into()),
            max_results: 2,
        };
        assert!(paginate(vec![1, 2, 3], &page).is_err());
    }
}

//! Cleanup Procedure
//!
//! Tears down an experiment in dependency order: detach and delete each
//! trial's components, delete the trial, then delete the experiment.
//! External jobs are never touched.

use std::thread;

use tracing::{debug, info, warn};

use crate::error::EntityKind;
use crate::experiment::TrialComponentRecord;
use crate::registry::{ComponentFilter, Page, PageRequest, Registry, SortBy, SortOrder};
use crate::{Error, Result, TrackingContext};

/// What a cleanup run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Trials deleted
    pub trials_deleted: usize,
    /// Trial components deleted
    pub components_deleted: usize,
    /// Components left in place because another trial claimed them
    pub components_skipped: usize,
}

/// Delete `experiment_name` together with its trials and their components.
///
/// Components are detached before deletion; one that was re-associated with
/// another trial in the meantime is skipped. The configured delete delay is
/// slept between consecutive component deletions, across trial boundaries.
///
/// # Example
///
/// ```rust
/// use workflow_trials::cleanup::cleanup_experiment;
/// use workflow_trials::registry::ExperimentRegistryClient;
/// use workflow_trials::TrackingContext;
///
/// # fn main() -> workflow_trials::Result<()> {
/// let ctx = TrackingContext::in_memory();
/// ExperimentRegistryClient::new(&ctx).create("exp", "demo")?;
///
/// let report = cleanup_experiment(&ctx, "exp")?;
/// assert_eq!(report.trials_deleted, 0);
/// assert!(cleanup_experiment(&ctx, "exp").is_err());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// `NotFound` if the experiment is absent (nothing is modified in that
/// case). Any other registry error aborts the run; records already deleted
/// stay deleted.
pub fn cleanup_experiment(ctx: &TrackingContext, experiment_name: &str) -> Result<CleanupReport> {
    let registry = ctx.registry();
    registry.get_experiment(experiment_name)?;

    let page_size = ctx.config().listing.page_size;
    let delay = ctx.config().cleanup.delete_delay();
    let mut report = CleanupReport::default();

    // Collect before deleting so offsets of later pages do not shift.
    let trials = collect_pages(page_size, |page| {
        registry.list_trials(experiment_name, SortBy::CreationTime, SortOrder::Ascending, page)
    })?;
    info!(experiment = experiment_name, trials = trials.len(), "cleanup started");

    let mut first_deletion = true;
    for trial in &trials {
        let filter = ComponentFilter::Trial(trial.name().to_string());
        let components = collect_pages(page_size, |page| {
            registry.list_trial_components(&filter, SortBy::CreationTime, SortOrder::Ascending, page)
        })?;

        for component in &components {
            if !first_deletion && !delay.is_zero() {
                thread::sleep(delay);
            }
            first_deletion = false;
            if delete_component(registry, component, trial.name())? {
                report.components_deleted += 1;
            } else {
                report.components_skipped += 1;
            }
        }

        registry.delete_trial(trial.name())?;
        report.trials_deleted += 1;
        debug!(trial = trial.name(), components = components.len(), "trial deleted");
    }

    registry.delete_experiment(experiment_name)?;
    info!(
        experiment = experiment_name,
        trials = report.trials_deleted,
        components = report.components_deleted,
        skipped = report.components_skipped,
        "cleanup finished"
    );
    Ok(report)
}

/// Detach then delete one component. `Ok(false)` means it was skipped.
fn delete_component(
    registry: &dyn Registry,
    component: &TrialComponentRecord,
    trial_name: &str,
) -> Result<bool> {
    let name = component.name();
    match registry.disassociate_trial_component(name, trial_name) {
        Ok(()) => {}
        // Moved to another trial or removed since it was listed.
        Err(e) if e.is_not_found(EntityKind::TrialComponent) => {
            debug!(component = name, trial = trial_name, "already detached");
        }
        Err(e) => return Err(e),
    }

    match registry.delete_trial_component(name) {
        Ok(()) => {
            debug!(component = name, "trial component deleted");
            Ok(true)
        }
        Err(Error::AssociatedElsewhere { trial, .. }) => {
            warn!(component = name, owner = %trial, "component claimed by another trial, skipping");
            Ok(false)
        }
        Err(e) if e.is_not_found(EntityKind::TrialComponent) => {
            debug!(component = name, "trial component already gone");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn collect_pages<T, F>(page_size: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(&PageRequest) -> Result<Page<T>>,
{
    let mut page = PageRequest::first(page_size);
    let mut items = Vec::new();
    loop {
        let result = fetch(&page)?;
        items.extend(result.items);
        match result.next_token {
            Some(token) => page.next_token = Some(token),
            None => return Ok(items),
        }
    }
}

//! In-memory registry implementation using `DashMap`.
//!
//! Stands in for the managed registry in tests, demos and local runs. Data
//! lives for the process lifetime unless saved with
//! [`MemoryRegistry::save_snapshot`].
//!
//! Lock order: whenever a call holds an entry of one collection while
//! touching another, it goes experiments → trials → components → metrics.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::{compare_records, paginate, ComponentFilter, Page, PageRequest, Registry, SortBy, SortOrder};
use crate::error::EntityKind;
use crate::experiment::{
    validate_name, ExperimentRecord, MetricRecord, TrialComponentRecord, TrialRecord,
    MAX_NAME_LEN,
};
use crate::{Error, Result};

/// In-memory experiment registry on concurrent hashmaps.
///
/// Enforces name uniqueness and the reference constraints of the managed
/// registry, so the façade behaves the same against it.
///
/// # Example
///
/// ```rust
/// use workflow_trials::experiment::{ExperimentRecord, TrialRecord};
/// use workflow_trials::registry::{MemoryRegistry, Registry};
///
/// # fn example() -> workflow_trials::Result<()> {
/// let registry = MemoryRegistry::new();
/// registry.create_experiment(ExperimentRecord::new("exp", "demo"))?;
/// registry.create_trial(TrialRecord::new("trial-1", "exp"))?;
///
/// // The trial blocks deletion of its experiment
/// assert!(registry.delete_experiment("exp").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    experiments: DashMap<String, ExperimentRecord>,
    trials: DashMap<String, TrialRecord>,
    components: DashMap<String, TrialComponentRecord>,
    metrics: DashMap<String, Vec<MetricRecord>>,
}

/// Serialized form of a [`MemoryRegistry`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistrySnapshot {
    experiments: Vec<ExperimentRecord>,
    trials: Vec<TrialRecord>,
    trial_components: Vec<TrialComponentRecord>,
    metrics: Vec<MetricRecord>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of trials.
    #[must_use]
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    /// Number of trial components.
    #[must_use]
    pub fn trial_component_count(&self) -> usize {
        self.components.len()
    }

    /// Check if the registry holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.trials.is_empty() && self.components.is_empty()
    }

    /// Write every record to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = RegistrySnapshot {
            experiments: self.experiments.iter().map(|e| e.value().clone()).collect(),
            trials: self.trials.iter().map(|t| t.value().clone()).collect(),
            trial_components: self.components.iter().map(|c| c.value().clone()).collect(),
            metrics: self
                .metrics
                .iter()
                .flat_map(|m| m.value().clone())
                .collect(),
        };

        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            experiments = snapshot.experiments.len(),
            trials = snapshot.trials.len(),
            trial_components = snapshot.trial_components.len(),
            "registry snapshot saved"
        );
        Ok(())
    }

    /// Load a registry previously written by [`save_snapshot`](Self::save_snapshot).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid snapshot.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: RegistrySnapshot = serde_json::from_reader(BufReader::new(file))?;

        let registry = Self::new();
        for e in snapshot.experiments {
            registry.experiments.insert(e.name().to_string(), e);
        }
        for t in snapshot.trials {
            registry.trials.insert(t.name().to_string(), t);
        }
        for c in snapshot.trial_components {
            registry.components.insert(c.name().to_string(), c);
        }
        for m in snapshot.metrics {
            registry
                .metrics
                .entry(m.trial_component_name().to_string())
                .or_default()
                .push(m);
        }
        Ok(registry)
    }
}

impl Registry for MemoryRegistry {
    fn create_experiment(&self, experiment: ExperimentRecord) -> Result<()> {
        validate_name(EntityKind::Experiment, experiment.name(), MAX_NAME_LEN)?;
        match self.experiments.entry(experiment.name().to_string()) {
            Entry::Occupied(e) => Err(Error::already_exists(EntityKind::Experiment, e.key())),
            Entry::Vacant(v) => {
                v.insert(experiment);
                Ok(())
            }
        }
    }

    fn get_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        self.experiments
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found(EntityKind::Experiment, name))
    }

    fn delete_experiment(&self, name: &str) -> Result<()> {
        let mut dependents = None;
        let removed = self.experiments.remove_if(name, |_, _| {
            let n = self
                .trials
                .iter()
                .filter(|t| t.experiment_name() == name)
                .count();
            dependents = Some(n);
            n == 0
        });

        match (removed, dependents) {
            (Some(_), _) => Ok(()),
            (None, Some(n)) => Err(Error::HasDependents {
                kind: EntityKind::Experiment,
                name: name.to_string(),
                dependents: n,
            }),
            (None, None) => Err(Error::not_found(EntityKind::Experiment, name)),
        }
    }

    fn create_trial(&self, trial: TrialRecord) -> Result<()> {
        validate_name(EntityKind::Trial, trial.name(), MAX_NAME_LEN)?;
        let _experiment = self
            .experiments
            .get(trial.experiment_name())
            .ok_or_else(|| Error::not_found(EntityKind::Experiment, trial.experiment_name()))?;

        match self.trials.entry(trial.name().to_string()) {
            Entry::Occupied(e) => Err(Error::already_exists(EntityKind::Trial, e.key())),
            Entry::Vacant(v) => {
                v.insert(trial);
                Ok(())
            }
        }
    }

    fn get_trial(&self, name: &str) -> Result<TrialRecord> {
        self.trials
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::not_found(EntityKind::Trial, name))
    }

    fn list_trials(
        &self,
        experiment_name: &str,
        sort_by: SortBy,
        order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<TrialRecord>> {
        if !self.experiments.contains_key(experiment_name) {
            return Err(Error::not_found(EntityKind::Experiment, experiment_name));
        }

        let mut trials: Vec<TrialRecord> = self
            .trials
            .iter()
            .filter(|t| t.experiment_name() == experiment_name)
            .map(|t| t.value().clone())
            .collect();
        trials.sort_by(|a, b| {
            compare_records(
                (a.name(), a.created_at()),
                (b.name(), b.created_at()),
                sort_by,
                order,
            )
        });

        paginate(trials, page)
    }

    fn delete_trial(&self, name: &str) -> Result<()> {
        let mut dependents = None;
        let removed = self.trials.remove_if(name, |_, _| {
            let n = self
                .components
                .iter()
                .filter(|c| c.trial_name() == Some(name))
                .count();
            dependents = Some(n);
            n == 0
        });

        match (removed, dependents) {
            (Some(_), _) => Ok(()),
            (None, Some(n)) => Err(Error::HasDependents {
                kind: EntityKind::Trial,
                name: name.to_string(),
                dependents: n,
            }),
            (None, None) => Err(Error::not_found(EntityKind::Trial, name)),
        }
    }

    fn create_trial_component(&self, component: TrialComponentRecord) -> Result<()> {
        validate_name(EntityKind::TrialComponent, component.name(), MAX_NAME_LEN)?;
        match self.components.entry(component.name().to_string()) {
            Entry::Occupied(e) => Err(Error::already_exists(EntityKind::TrialComponent, e.key())),
            Entry::Vacant(v) => {
                v.insert(component);
                Ok(())
            }
        }
    }

    fn get_trial_component(&self, name: &str) -> Result<TrialComponentRecord> {
        self.components
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| Error::not_found(EntityKind::TrialComponent, name))
    }

    fn update_trial_component(&self, mut component: TrialComponentRecord) -> Result<()> {
        let mut existing = self
            .components
            .get_mut(component.name())
            .ok_or_else(|| Error::not_found(EntityKind::TrialComponent, component.name()))?;

        match existing.trial_name() {
            Some(trial) => component.attach(trial),
            None => component.detach(),
        }
        *existing = component;
        Ok(())
    }

    fn find_trial_component_by_source(
        &self,
        source_arn: &str,
    ) -> Result<Option<TrialComponentRecord>> {
        Ok(self
            .components
            .iter()
            .find(|c| c.source().is_some_and(|s| s.source_arn == source_arn))
            .map(|c| c.value().clone()))
    }

    fn list_trial_components(
        &self,
        filter: &ComponentFilter,
        sort_by: SortBy,
        order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<TrialComponentRecord>> {
        let trial_names: FxHashSet<String> = match filter {
            ComponentFilter::Trial(trial) => {
                if !self.trials.contains_key(trial) {
                    return Err(Error::not_found(EntityKind::Trial, trial));
                }
                std::iter::once(trial.clone()).collect()
            }
            ComponentFilter::Experiment(experiment) => {
                if !self.experiments.contains_key(experiment) {
                    return Err(Error::not_found(EntityKind::Experiment, experiment));
                }
                self.trials
                    .iter()
                    .filter(|t| t.experiment_name() == experiment)
                    .map(|t| t.key().clone())
                    .collect()
            }
        };

        let mut components: Vec<TrialComponentRecord> = self
            .components
            .iter()
            .filter(|c| c.trial_name().is_some_and(|t| trial_names.contains(t)))
            .map(|c| c.value().clone())
            .collect();
        components.sort_by(|a, b| {
            compare_records(
                (a.name(), a.created_at()),
                (b.name(), b.created_at()),
                sort_by,
                order,
            )
        });

        paginate(components, page)
    }

    fn associate_trial_component(&self, component_name: &str, trial_name: &str) -> Result<()> {
        let _trial = self
            .trials
            .get(trial_name)
            .ok_or_else(|| Error::not_found(EntityKind::Trial, trial_name))?;
        let mut component = self
            .components
            .get_mut(component_name)
            .ok_or_else(|| Error::not_found(EntityKind::TrialComponent, component_name))?;

        match component.trial_name() {
            Some(current) if current == trial_name => Ok(()),
            Some(current) => Err(Error::AssociatedElsewhere {
                component: component_name.to_string(),
                trial: current.to_string(),
            }),
            None => {
                component.attach(trial_name);
                Ok(())
            }
        }
    }

    fn disassociate_trial_component(
        &self,
        component_name: &str,
        trial_name: &str,
    ) -> Result<()> {
        let mut component = self
            .components
            .get_mut(component_name)
            .ok_or_else(|| Error::not_found(EntityKind::TrialComponent, component_name))?;

        if component.trial_name() != Some(trial_name) {
            return Err(Error::not_found(
                EntityKind::TrialComponent,
                format!("{component_name} (in trial {trial_name})"),
            ));
        }
        component.detach();
        Ok(())
    }

    fn delete_trial_component(&self, name: &str) -> Result<()> {
        let mut owner: Option<Option<String>> = None;
        let removed = self.components.remove_if(name, |_, c| {
            let trial = c.trial_name().map(str::to_string);
            let free = trial.is_none();
            owner = Some(trial);
            free
        });

        match (removed, owner) {
            (Some(_), _) => {
                self.metrics.remove(name);
                Ok(())
            }
            (None, Some(Some(trial))) => Err(Error::AssociatedElsewhere {
                component: name.to_string(),
                trial,
            }),
            (None, _) => Err(Error::not_found(EntityKind::TrialComponent, name)),
        }
    }

    fn log_metrics(&self, component_name: &str, metrics: Vec<MetricRecord>) -> Result<()> {
        let _component = self
            .components
            .get(component_name)
            .ok_or_else(|| Error::not_found(EntityKind::TrialComponent, component_name))?;

        self.metrics
            .entry(component_name.to_string())
            .or_default()
            .extend(metrics.into_iter().map(|m| m.for_component(component_name)));
        Ok(())
    }

    fn get_metrics(&self, component_name: &str) -> Result<Vec<MetricRecord>> {
        if !self.components.contains_key(component_name) {
            return Err(Error::not_found(EntityKind::TrialComponent, component_name));
        }

        let mut metrics = self
            .metrics
            .get(component_name)
            .map(|m| m.value().clone())
            .unwrap_or_default();
        metrics.sort_by(|a, b| a.key().cmp(b.key()).then(a.step().cmp(&b.step())));
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::TrialSource;

    fn seeded() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry
            .create_experiment(ExperimentRecord::new("exp", "demo"))
            .unwrap();
        registry
            .create_trial(TrialRecord::new("trial-1", "exp"))
            .unwrap();
        registry
            .create_trial_component(
                TrialComponentRecord::builder("job-1", "Training")
                    .source(TrialSource::new("arn:job-1", None))
                    .build(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_memory_registry_default() {
        let registry = MemoryRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.experiment_count(), 0);
    }

    #[test]
    fn test_create_experiment_duplicate() {
        let registry = seeded();
        let err = registry
            .create_experiment(ExperimentRecord::new("exp", "again"))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { kind: EntityKind::Experiment, .. }));
    }

    #[test]
    fn test_create_experiment_invalid_name() {
        let registry = MemoryRegistry::new();
        let err = registry
            .create_experiment(ExperimentRecord::new("bad name", ""))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_create_trial_requires_experiment() {
        let registry = MemoryRegistry::new();
        let err = registry
            .create_trial(TrialRecord::new("trial-1", "missing"))
            .unwrap_err();
        assert!(err.is_not_found(EntityKind::Experiment));
    }

    #[test]
    fn test_delete_experiment_with_trial_fails() {
        let registry = seeded();
        let err = registry.delete_experiment("exp").unwrap_err();
        assert!(matches!(err, Error::HasDependents { dependents: 1, .. }));
        assert!(registry.get_experiment("exp").is_ok());
    }

    #[test]
    fn test_associate_and_delete_guards() {
        let registry = seeded();
        registry.associate_trial_component("job-1", "trial-1").unwrap();
        // idempotent
        registry.associate_trial_component("job-1", "trial-1").unwrap();

        let err = registry.delete_trial("trial-1").unwrap_err();
        assert!(matches!(err, Error::HasDependents { kind: EntityKind::Trial, .. }));

        let err = registry.delete_trial_component("job-1").unwrap_err();
        assert!(matches!(err, Error::AssociatedElsewhere { .. }));

        registry.disassociate_trial_component("job-1", "trial-1").unwrap();
        registry.delete_trial_component("job-1").unwrap();
        registry.delete_trial("trial-1").unwrap();
        registry.delete_experiment("exp").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_associate_with_second_trial_fails() {
        let registry = seeded();
        registry
            .create_trial(TrialRecord::new("trial-2", "exp"))
            .unwrap();
        registry.associate_trial_component("job-1", "trial-1").unwrap();

        let err = registry
            .associate_trial_component("job-1", "trial-2")
            .unwrap_err();
        assert!(matches!(err, Error::AssociatedElsewhere { ref trial, .. } if trial == "trial-1"));
    }

    #[test]
    fn test_update_keeps_association() {
        let registry = seeded();
        registry.associate_trial_component("job-1", "trial-1").unwrap();

        let mut component = registry.get_trial_component("job-1").unwrap();
        component.detach();
        component.complete(
            crate::experiment::TrialComponentStatus::Completed,
            chrono::Utc::now(),
        );
        registry.update_trial_component(component).unwrap();

        let stored = registry.get_trial_component("job-1").unwrap();
        assert_eq!(stored.trial_name(), Some("trial-1"));
        assert!(stored.status().is_terminal());
    }

    #[test]
    fn test_find_by_source() {
        let registry = seeded();
        let found = registry.find_trial_component_by_source("arn:job-1").unwrap();
        assert_eq!(found.map(|c| c.name().to_string()), Some("job-1".into()));
        assert!(registry
            .find_trial_component_by_source("arn:other")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_metrics_ordering() {
        let registry = seeded();
        registry
            .log_metrics(
                "job-1",
                vec![
                    MetricRecord::new("ignored", "loss", 1, 0.5),
                    MetricRecord::new("ignored", "accuracy", 0, 0.7),
                    MetricRecord::new("ignored", "loss", 0, 0.9),
                ],
            )
            .unwrap();

        let metrics = registry.get_metrics("job-1").unwrap();
        let keys: Vec<(&str, u64)> = metrics.iter().map(|m| (m.key(), m.step())).collect();
        assert_eq!(keys, vec![("accuracy", 0), ("loss", 0), ("loss", 1)]);
        assert!(metrics.iter().all(|m| m.trial_component_name() == "job-1"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let registry = seeded();
        registry.associate_trial_component("job-1", "trial-1").unwrap();
        registry
            .log_metrics("job-1", vec![MetricRecord::new("job-1", "loss", 0, 0.3)])
            .unwrap();

        let path = std::env::temp_dir().join(format!(
            "workflow_trials_snapshot_{}.json",
            std::process::id()
        ));
        registry.save_snapshot(&path).unwrap();
        let restored = MemoryRegistry::load_snapshot(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.experiment_count(), 1);
        assert_eq!(restored.trial_count(), 1);
        assert_eq!(
            restored.get_trial_component("job-1").unwrap().trial_name(),
            Some("trial-1")
        );
        assert_eq!(restored.get_metrics("job-1").unwrap().len(), 1);
    }
}

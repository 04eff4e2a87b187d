//! Experiment Tracking Schema
//!
//! Records persisted by the registry for experiment tracking.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< TrialRecord (N)        [by experiment name]
//!                              │
//!                              └──< TrialComponentRecord (N) [mutable association]
//!                                        ├──< MetricRecord (N) [time-series]
//!                                        └──< ArtifactRecord (N) [input/output URIs]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use workflow_trials::experiment::{
//!     ExperimentRecord, TrialComponentRecord, TrialComponentStatus, TrialRecord,
//! };
//!
//! let experiment = ExperimentRecord::new("fashion-mnist", "CNN classifier");
//! let trial = TrialRecord::new("fashion-mnist-run-1", experiment.name());
//!
//! let mut component = TrialComponentRecord::new("training-run-1", "Training");
//! component.complete(TrialComponentStatus::Completed, chrono::Utc::now());
//! # let _ = trial;
//! ```

mod artifact_record;
mod experiment_record;
mod metric_record;
mod trial_component_record;
mod trial_record;

pub use artifact_record::ArtifactRecord;
pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder};
pub use metric_record::{MetricRecord, MetricSummary};
pub use trial_component_record::{
    ParameterValue, TrialComponentRecord, TrialComponentRecordBuilder, TrialComponentStatus,
};
pub use trial_record::{TrialRecord, TrialRecordBuilder, TrialSource};

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::error::EntityKind;
use crate::{Error, Result};

/// Longest experiment, trial or component name the registry accepts.
pub const MAX_NAME_LEN: usize = 120;

/// Longest job name the execution platform accepts.
pub const MAX_JOB_NAME_LEN: usize = 63;

/// Validate a registry or job name.
///
/// Names are 1..=`max_len` ASCII alphanumerics or hyphens and start with an
/// alphanumeric.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] describing the first violated rule.
pub fn validate_name(kind: EntityKind, name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{kind} name must not be empty")));
    }
    if name.len() > max_len {
        return Err(Error::InvalidInput(format!(
            "{kind} name '{name}' is {} characters, limit is {max_len}",
            name.len()
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidInput(format!(
            "{kind} name '{name}' must start with a letter or digit"
        )));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(Error::InvalidInput(format!(
            "{kind} name '{name}' contains '{bad}'; only letters, digits and '-' are allowed"
        )));
    }
    Ok(())
}

/// Map an arbitrary identifier onto the name alphabet.
///
/// Disallowed characters become `-`, runs of `-` collapse, and the result is
/// truncated to `max_len` without a trailing hyphen.
#[must_use]
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(raw.len().min(max_len));
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '-' };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.truncate(max_len);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Derive a valid name of at most `max_len` characters from `raw`.
///
/// `raw` is returned as is when it is already a valid name that fits.
/// Otherwise the name is a sanitized prefix followed by a 16-hex FxHash of
/// `key`, so keys that sanitize or truncate alike still get distinct names.
#[must_use]
pub fn unique_name<K: Hash + ?Sized>(raw: &str, key: &K, max_len: usize) -> String {
    let clean = sanitize_name(raw, usize::MAX);
    if clean == raw && clean.len() <= max_len {
        return clean;
    }

    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    let suffix = format!("{:016x}", hasher.finish());
    let prefix = sanitize_name(&clean, max_len.saturating_sub(suffix.len() + 1));
    if prefix.is_empty() {
        suffix
    } else {
        format!("{prefix}-{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_platform_names() {
        validate_name(EntityKind::Experiment, "fashion-mnist-classification-experiment", MAX_NAME_LEN)
            .unwrap();
    }

    #[test]
    fn test_validate_name_rejects() {
        assert!(validate_name(EntityKind::Trial, "", MAX_NAME_LEN).is_err());
        assert!(validate_name(EntityKind::Trial, "-leading", MAX_NAME_LEN).is_err());
        assert!(validate_name(EntityKind::Trial, "under_score", MAX_NAME_LEN).is_err());
        assert!(validate_name(EntityKind::Job, &"a".repeat(64), MAX_JOB_NAME_LEN).is_err());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(
            sanitize_name("manual__2024-01-01T00:00:00+00:00", MAX_NAME_LEN),
            "manual-2024-01-01T00-00-00-00-00"
        );
        assert_eq!(sanitize_name("abc---", 10), "abc");
        assert_eq!(sanitize_name("abcdef-ghij", 7), "abcdef");
    }

    #[test]
    fn test_unique_name_keeps_valid_names() {
        assert_eq!(unique_name("exp-run-1", &("exp", "run-1"), MAX_NAME_LEN), "exp-run-1");
    }

    #[test]
    fn test_unique_name_separates_punctuation_variants() {
        let a = unique_name("exp-run_1", &("exp", "run_1"), MAX_NAME_LEN);
        let b = unique_name("exp-run.1", &("exp", "run.1"), MAX_NAME_LEN);
        let c = unique_name("exp-run-1", &("exp", "run-1"), MAX_NAME_LEN);

        assert!(a.starts_with("exp-run-1-"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
        validate_name(EntityKind::Trial, &a, MAX_NAME_LEN).unwrap();
    }

    #[test]
    fn test_unique_name_separates_truncated_names() {
        let long = "x".repeat(MAX_JOB_NAME_LEN);
        let a = unique_name(&format!("{long}-training"), &("training", 1), MAX_JOB_NAME_LEN);
        let b = unique_name(&format!("{long}-transform"), &("transform", 1), MAX_JOB_NAME_LEN);

        assert_eq!(a.len(), MAX_JOB_NAME_LEN);
        assert_ne!(a, b);
        validate_name(EntityKind::Job, &b, MAX_JOB_NAME_LEN).unwrap();
    }

    #[test]
    fn test_unique_name_all_punctuation() {
        let name = unique_name("__", &"__", MAX_JOB_NAME_LEN);
        assert_eq!(name.len(), 16);
        validate_name(EntityKind::Job, &name, MAX_JOB_NAME_LEN).unwrap();
    }
}

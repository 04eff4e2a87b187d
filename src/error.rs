//! Error types for workflow-trials
//!
//! Every façade operation surfaces these unchanged; only the cleanup
//! procedure recovers locally (from [`Error::AssociatedElsewhere`]).

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of tracked entity named in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Experiment record
    Experiment,
    /// Trial record
    Trial,
    /// Trial component record
    TrialComponent,
    /// External job on the execution platform
    Job,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Experiment => "experiment",
            Self::Trial => "trial",
            Self::TrialComponent => "trial component",
            Self::Job => "job",
        };
        f.write_str(s)
    }
}

/// workflow-trials error types
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced experiment, trial, component or job is absent
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was looked up
        kind: EntityKind,
        /// Name used for the lookup
        name: String,
    },

    /// Duplicate create
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// What was created
        kind: EntityKind,
        /// Conflicting name
        name: String,
    },

    /// Deletion blocked by records that still reference the target
    #[error("cannot delete {kind} '{name}': {dependents} dependent record(s) still reference it\nDelete or detach them first.")]
    HasDependents {
        /// What was being deleted
        kind: EntityKind,
        /// Name of the record being deleted
        name: String,
        /// Number of referencing records
        dependents: usize,
    },

    /// Trial component deletion blocked by an association with a trial
    #[error("trial component '{component}' is associated with trial '{trial}'")]
    AssociatedElsewhere {
        /// Component being deleted or associated
        component: String,
        /// Trial that currently owns the association
        trial: String,
    },

    /// External job submission rejected
    #[error("job submission '{job_name}' failed: {reason}")]
    SubmitFailed {
        /// Job name used as idempotency key
        job_name: String,
        /// Platform-provided reason
        reason: String,
    },

    /// Job was accepted but its trial component was not recorded
    #[error("job '{job_name}' ran but was not tracked: {reason}")]
    TrackingFailed {
        /// Job that ran untracked
        job_name: String,
        /// What was missing
        reason: String,
    },

    /// Rate limiting or network failure; caller should retry with backoff
    #[error("transient platform error: {0}\nRetry with backoff.")]
    TransientPlatformError(String),

    /// A task asked for the output of an upstream task that did not produce one
    #[error("upstream task '{0}' has no recorded output in this run")]
    MissingUpstream(String),

    /// Caller-supplied value failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Table export/import error (Parquet)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Shorthand for [`Error::AlreadyExists`].
    pub fn already_exists(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientPlatformError(_))
    }

    /// Whether this is a `NotFound` for the given entity kind.
    #[must_use]
    pub fn is_not_found(&self, expected: EntityKind) -> bool {
        matches!(self, Self::NotFound { kind, .. } if *kind == expected)
    }
}

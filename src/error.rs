//! Error types for observers, broadcasts and scenario files.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an observer from its `update` call.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("update rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl UpdateError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Failure attributed to a single registered observer.
#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("observer '{observer}' failed to update")]
    UpdateFailed {
        observer: String,
        #[source]
        source: UpdateError,
    },

    #[error("observer '{observer}' is already being updated")]
    Busy { observer: String },

    #[error("observer '{observer}' is already registered")]
    Duplicate { observer: String },
}

impl ObserverError {
    pub fn observer(&self) -> &str {
        match self {
            ObserverError::UpdateFailed { observer, .. }
            | ObserverError::Busy { observer }
            | ObserverError::Duplicate { observer } => observer,
        }
    }
}

/// Every observer failure collected during one broadcast.
///
/// Under fail-fast notification this holds exactly one failure.
#[derive(Error, Debug)]
#[error("{} observer(s) failed during notification", .failures.len())]
pub struct NotifyError {
    failures: Vec<ObserverError>,
}

impl NotifyError {
    pub fn new(failures: Vec<ObserverError>) -> Self {
        NotifyError { failures }
    }

    pub fn single(failure: ObserverError) -> Self {
        NotifyError {
            failures: vec![failure],
        }
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first(&self) -> Option<&ObserverError> {
        self.failures.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObserverError> {
        self.failures.iter()
    }

    pub fn into_failures(self) -> Vec<ObserverError> {
        self.failures
    }

    /// Ok if nothing failed, Err otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// One line per failure, numbered, including the root cause.
    pub fn display_all(&self) -> String {
        let mut lines = vec![format!("{} failure(s):", self.failures.len())];
        for (i, failure) in self.failures.iter().enumerate() {
            match std::error::Error::source(failure) {
                Some(cause) => lines.push(format!("  {}. {}: {}", i + 1, failure, cause)),
                None => lines.push(format!("  {}. {}", i + 1, failure)),
            }
        }
        lines.join("\n")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

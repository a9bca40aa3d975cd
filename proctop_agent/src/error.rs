//! Error types. Parsers never abort a refresh; these exist so callers (and tests)
//! can tell an absent source from a malformed one before falling back to a sentinel.

use std::path::PathBuf;

use thiserror::Error;

use crate::reader::Resource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatError {
    /// Source missing or unreadable (file gone, process exited mid-read).
    #[error("{resource} is absent")]
    Absent { resource: Resource },
    /// Source readable but failed a structural check.
    #[error("{resource} is malformed: {reason}")]
    Malformed {
        resource: Resource,
        reason: &'static str,
    },
}

impl StatError {
    pub fn absent(resource: Resource) -> Self {
        Self::Absent { resource }
    }

    pub fn malformed(resource: Resource, reason: &'static str) -> Self {
        Self::Malformed { resource, reason }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }
}

pub type StatResult<T> = Result<T, StatError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

//! Error types for the mapcheck harness.

use std::path::PathBuf;

use thiserror::Error;

use crate::harness::Failure;

/// Failures a subject may report through its capability interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    /// Insert refused because the subject is full.
    #[error("capacity exceeded (capacity={capacity})")]
    CapacityExceeded { capacity: u64 },

    /// A mutation was attempted before `init` or after `destroy`.
    #[error("subject used before init or after destroy")]
    NotInitialized,

    /// `init` was called on a live subject.
    #[error("subject initialized twice")]
    AlreadyInitialized,
}

/// Errors surfaced by the harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A structural parameter or CLI argument is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A replay log failed to parse or disagrees with declared parameters.
    #[error("corrupt replay log {}:{line}: {reason}", .path.display())]
    CorruptLog {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The `-d` selector names no registered subject.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// A subject failed in a way other than a capacity refusal.
    #[error("subject {subject} failed: {source}")]
    Subject {
        subject: String,
        #[source]
        source: SubjectError,
    },

    /// A subject disagreed with the oracle.
    #[error("{0}")]
    Divergence(Box<Failure>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        HarnessError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Divergence(_) => 1,
            HarnessError::Subject { .. } => 1,
            _ => 2,
        }
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

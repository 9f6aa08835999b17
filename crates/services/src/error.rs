//! Shared error types for the services crate.

use thiserror::Error;

use pathway_core::model::{DecisionId, OptionId, OutcomeError, ProgressError};
use pathway_core::unlock::UnlockError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification callers use to decide between fixing input and retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller; retrying the same call fails the same way.
    InvalidArgument,
    /// The progress store failed; nothing was applied and the call may be retried.
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Storage)
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Progress(_) => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors emitted by `CourseViewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseViewError {
    #[error(transparent)]
    Unlock(#[from] UnlockError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CourseViewError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unlock(_) => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors emitted while walking or finishing a lesson run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonRunError {
    #[error("lesson has no exercises")]
    Empty,
    #[error("lesson run is not complete: {answered} of {total} exercises answered")]
    Incomplete { answered: usize, total: usize },
    #[error("lesson run already answered every exercise")]
    Completed,
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

impl LessonRunError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Progress(inner) => inner.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors emitted by `DecisionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecisionServiceError {
    #[error("option {option} is not part of decision {decision}")]
    UnknownOption {
        decision: DecisionId,
        option: OptionId,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DecisionServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOption { .. } => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

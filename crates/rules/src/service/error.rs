use crate::report::ReportError;
use crate::repository::RepoError;
use crate::schema::TransitionError;
use crate::validation::ValidationResult;

/// Service-level error. Each variant is one distinguishable outcome a
/// transport layer can translate.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("entity not found")]
    NotFound,

    #[error("failed to {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: RepoError,
    },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("scheduler cancelled")]
    Cancelled,

    #[error("scheduler deadline exceeded")]
    DeadlineExceeded,
}

impl EngineError {
    /// Map a repository error for `operation`. `NotFound` and rejected
    /// transitions stay distinct.
    pub(crate) fn storage(operation: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| match source {
            RepoError::NotFound => EngineError::NotFound,
            RepoError::InvalidTransition(t) => EngineError::InvalidTransition(t),
            source => EngineError::Storage { operation, source },
        }
    }

    /// Shutdown outcomes of the poller, as opposed to faults.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::DeadlineExceeded)
    }
}

impl From<ValidationResult> for EngineError {
    fn from(result: ValidationResult) -> Self {
        EngineError::Validation(result.summary())
    }
}

impl From<ReportError> for EngineError {
    fn from(e: ReportError) -> Self {
        if e.is_invalid_request() {
            EngineError::Validation(e.to_string())
        } else {
            EngineError::Execution(e.to_string())
        }
    }
}

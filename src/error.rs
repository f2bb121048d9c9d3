use thiserror::Error;

use crate::schema::ValidationErrors;
use crate::store::StoreError;

/// Errors raised while staging or committing a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Malformed staging input (missing id, empty path, non-object entity).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more staged entities failed their declared rules.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The store rejected or failed to apply the atomic batch.
    #[error("commit failed: {0}")]
    Commit(#[from] StoreError),

    /// Entity serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A repository was requested for a type missing from the registry.
    #[error("no collection registered for type {0}")]
    UnregisteredType(&'static str),

    /// A previous commit on this unit failed; start a new unit.
    #[error("batch unit is poisoned by a failed commit")]
    Poisoned,

    /// Another commit on this unit has not finished yet.
    #[error("batch unit is already committing")]
    CommitInProgress,

    #[error("batch unit lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl BatchError {
    /// The validation failures carried by this error, if any.
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            BatchError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for BatchError {
    fn from(errors: ValidationErrors) -> Self {
        BatchError::Validation(errors)
    }
}

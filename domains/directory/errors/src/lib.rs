use directory_models::ConflictField;
use directory_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field} already exists: {value}")]
    Conflict { field: ConflictField, value: String },
    #[error("user not found: {user_id}")]
    NotFound { user_id: Uuid },
    #[error("user not found: {handle}")]
    HandleNotFound { handle: String },
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Store failures surface through the same taxonomy the pre-checks use:
/// a unique-constraint violation from a lost race is a [`Conflict`]
/// like any other, never an internal failure.
///
/// [`Conflict`]: DirectoryError::Conflict
impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field, value } => {
                Self::Conflict { field, value }
            }
            StoreError::NotFound { id } => {
                Self::NotFound { user_id: id }
            }
            StoreError::Unavailable(reason) => {
                Self::StoreUnavailable(reason)
            }
        }
    }
}

use thiserror::Error;

use crate::repository::RepositoryError;

/// Error taxonomy for the ASR engine, matching the kinds (not Rust
/// types) the orchestrator distinguishes when deciding whether to
/// skip an entity, roll back a transaction, or abort the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsrError {
    /// A referenced SKU, vendor, profile, or order is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A numeric or categorical input is out of range. Reported per
    /// entity; the entity is skipped, the run continues.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Upstream storage error. The current operation is rolled back;
    /// retryable errors may be retried by the caller.
    #[error("storage failure: {message}")]
    Storage { message: String, retryable: bool },

    /// An instruction cannot be executed (e.g. optimize to a bracket
    /// already exceeded). Reported with a benign outcome.
    #[error("policy failure: {message}")]
    Policy { message: String },

    /// The orchestrator cannot proceed at all.
    #[error("fatal: {message}")]
    Fatal { message: String },
}

impl AsrError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into(), id: id.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn storage(message: impl Into<String>, retryable: bool) -> Self {
        Self::Storage { message: message.into(), retryable }
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy { message: message.into() }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal { message: message.into() }
    }

    /// Whether the orchestrator should count this and continue, or abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { retryable: true, .. })
    }
}

/// Result type alias used by every component operation.
pub type AsrResult<T> = Result<T, AsrError>;

impl From<RepositoryError> for AsrError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity_type, id } => Self::not_found(entity_type, id),
            RepositoryError::Validation { field, message } => Self::validation(field, message),
            RepositoryError::Duplicate { entity_type, key } => {
                Self::validation(entity_type, format!("duplicate key: {key}"))
            }
            RepositoryError::Configuration { message } | RepositoryError::Migration { message } => {
                Self::fatal(message)
            }
            other => {
                let retryable = other.is_retryable();
                Self::storage(other.to_string(), retryable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found() {
        let err = AsrError::not_found("Sku", "ABC-1");
        assert!(matches!(err, AsrError::NotFound { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn storage_retryable_propagates_from_repository_error() {
        let repo_err = RepositoryError::connection("lost link");
        let err: AsrError = repo_err.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn configuration_repository_error_is_fatal() {
        let repo_err = RepositoryError::configuration("missing dsn");
        let err: AsrError = repo_err.into();
        assert!(err.is_fatal());
    }
}

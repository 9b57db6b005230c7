//! Core error types for choreflow-core.
//!
//! Every failure the workflow surfaces carries a stable machine-readable
//! code (see [`ChoreError::code`]) so callers at the boundary can map it to
//! an actionable message without matching on display strings.

use std::path::PathBuf;
use thiserror::Error;

use crate::completion::CompletionStatus;

/// Core error type for choreflow-core.
#[derive(Error, Debug)]
pub enum ChoreError {
    /// A required field is missing or malformed
    #[error("Invalid value for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// A second pending completion for the same user and task
    #[error("User '{user_id}' already has a completion awaiting approval for task '{task_id}' ({existing_id})")]
    DuplicatePending {
        user_id: String,
        task_id: String,
        existing_id: String,
    },

    /// Referenced completion, streak or holiday does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Transition attempted from a non-pending completion
    #[error("Completion '{id}' is already {status}; cannot {action}")]
    InvalidState {
        id: String,
        status: CompletionStatus,
        action: &'static str,
    },

    /// Approver or rejecter is the submitter
    #[error("User '{user_id}' cannot approve or reject their own completion")]
    SelfApproval { user_id: String },

    /// Underlying store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ChoreError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        ChoreError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ChoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ChoreError::InvalidInput { .. } => "INVALID_INPUT",
            ChoreError::DuplicatePending { .. } => "DUPLICATE_PENDING",
            ChoreError::NotFound { .. } => "NOT_FOUND",
            ChoreError::InvalidState { .. } => "INVALID_STATE",
            ChoreError::SelfApproval { .. } => "SELF_APPROVAL",
            ChoreError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message suitable for showing to a family member.
    pub fn user_message(&self) -> String {
        match self {
            ChoreError::InvalidInput { field, .. } => {
                format!("Please check the '{field}' field and try again.")
            }
            ChoreError::DuplicatePending { .. } => {
                "This task already has a submission awaiting approval.".to_string()
            }
            ChoreError::NotFound { entity, .. } => {
                format!("That {} no longer exists.", entity.to_lowercase())
            }
            ChoreError::InvalidState { status, .. } => {
                format!("This submission was already {status}.")
            }
            ChoreError::SelfApproval { .. } => {
                "Someone else needs to review this submission.".to_string()
            }
            ChoreError::Storage(_) => "Something went wrong saving your changes. Please try again.".to_string(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ChoreError::Storage(StorageError::Locked) | ChoreError::Storage(StorageError::Poisoned(_))
        )
    }
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// A per-key lock was poisoned by a panicking writer
    #[error("Lock poisoned for key '{0}'")]
    Poisoned(String),

    /// Stored value could not be encoded or decoded
    #[error("Failed to (de)serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to locate the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for ChoreError
pub type Result<T, E = ChoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            ChoreError::invalid_input("task_id", "empty").code(),
            "INVALID_INPUT"
        );
        assert_eq!(
            ChoreError::not_found("Completion", "c1").code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ChoreError::SelfApproval {
                user_id: "kid".into()
            }
            .code(),
            "SELF_APPROVAL"
        );
        assert_eq!(
            ChoreError::from(StorageError::Locked).code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn duplicate_pending_has_actionable_message() {
        let err = ChoreError::DuplicatePending {
            user_id: "kid".into(),
            task_id: "dishes".into(),
            existing_id: "c1".into(),
        };
        assert_eq!(
            err.user_message(),
            "This task already has a submission awaiting approval."
        );
        assert!(!err.is_retriable());
    }

    #[test]
    fn invalid_state_mentions_status() {
        let err = ChoreError::InvalidState {
            id: "c1".into(),
            status: CompletionStatus::Approved,
            action: "approve",
        };
        assert!(err.to_string().contains("already approved"));
        assert_eq!(err.user_message(), "This submission was already approved.");
    }

    #[test]
    fn locked_store_is_retriable() {
        assert!(ChoreError::from(StorageError::Locked).is_retriable());
    }
}

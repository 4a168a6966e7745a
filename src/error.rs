//! Error types for tasklify
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, validation, not logged in, unknown task)
//! - 3: Access denied (PIN required, incorrect PIN, account limit)
//! - 4: Operation failed (storage, serialization, locking)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasklify CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const ACCESS_DENIED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasklify operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    // Access denied (exit code 3)
    #[error("PIN required")]
    PinRequired,

    #[error("Incorrect PIN")]
    IncorrectPin,

    #[error("Maximum of {limit} accounts reached. Delete an account to add a new one.")]
    AccountLimit { limit: usize },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Storage full: writing {key} would exceed the {quota} byte quota")]
    StorageFull { key: String, quota: u64 },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::NotLoggedIn
            | Error::TaskNotFound(_)
            | Error::ProfileNotFound(_) => exit_codes::USER_ERROR,

            // Access denied
            Error::PinRequired | Error::IncorrectPin | Error::AccountLimit { .. } => {
                exit_codes::ACCESS_DENIED
            }

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::StorageFull { .. }
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the error carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::AccountLimit { limit } => Some(serde_json::json!({ "limit": limit })),
            Error::StorageFull { key, quota } => {
                Some(serde_json::json!({ "key": key, "quota": quota }))
            }
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            _ => None,
        }
    }

    /// True for authentication failures that belong inline on the login form.
    pub fn is_auth_failure(&self) -> bool {
        self.exit_code() == exit_codes::ACCESS_DENIED
    }
}

/// Result type alias for tasklify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}

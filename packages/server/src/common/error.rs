//! Error taxonomy shared by the REST facade and the realtime router.
//!
//! The domain core returns these typed errors; each transport translates
//! them into its own wire shape (HTTP status + JSON envelope, or an
//! `error`/`auth_error` event) without the core knowing about either.

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Field-level validation detail, surfaced in the `errors` array of the
/// response envelope.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-range input. Never retried.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Missing/invalid/expired token, or the authenticated identity no
    /// longer resolves. The caller must re-authenticate.
    #[error("{0}")]
    Auth(String),

    /// Authenticated but not allowed to perform this operation.
    #[error("{0}")]
    Forbidden(String),

    /// The entity exists but its current state does not permit the
    /// operation. Carries the current state so clients can render it.
    #[error("{message} (current status: {current})")]
    InvalidState { message: String, current: String },

    /// Referenced entity id does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate action: second rating by the same party, duplicate pending
    /// swap between the same pair, duplicate email at registration.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Single-field validation shortcut.
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn invalid_state(message: impl Into<String>, current: impl ToString) -> Self {
        AppError::InvalidState {
            message: message.into(),
            current: current.to_string(),
        }
    }
}

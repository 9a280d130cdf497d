//! Error type shared by the desk, knowledge-base and settings stores.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    /// The referenced record (or record kind) does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The request is well-formed but breaks a business rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller is not allowed to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DeskError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        DeskError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DeskError::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for DeskError {
    fn from(e: rusqlite::Error) -> Self {
        DeskError::Database(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DeskError::Database(format!("connection lock poisoned: {}", e))
    }
}

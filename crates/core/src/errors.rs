use thiserror::Error;

use crate::domain::quote::QuoteStatus;

/// Core error taxonomy. Every variant carries enough context for the
/// transport layer to map it to a response without re-inspecting state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid quote transition from {from:?} to {to:?}, allowed: {allowed:?}")]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus, allowed: Vec<QuoteStatus> },
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Callers may retry only conflicts (fresh read, fresh folio); every
    /// other kind needs a corrected request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

//! Domain error type and its HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event {0} not found")]
    EventNotFound(i64),

    #[error("Amount must be a positive number")]
    InvalidAmount,

    #[error("Advance cannot become negative")]
    NegativeBalance,

    #[error("Advance is kept in {expected}; convert the amount before submitting")]
    CurrencyMismatch { expected: String },

    #[error("Advance was modified by another request; reload and try again")]
    VersionConflict,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid phone number format. Expected +998XXXXXXXXX")]
    InvalidPhone(String),

    #[error("A message to {0} is already being sent. Please wait.")]
    SendInProgress(String),

    #[error("{0}")]
    Delivery(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::EventNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidAmount
            | DomainError::NegativeBalance
            | DomainError::CurrencyMismatch { .. }
            | DomainError::Validation(_)
            | DomainError::InvalidPhone(_) => StatusCode::BAD_REQUEST,
            DomainError::VersionConflict | DomainError::SendInProgress(_) => StatusCode::CONFLICT,
            DomainError::Delivery(_) => StatusCode::BAD_GATEWAY,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to callers. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DomainError::EventNotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(DomainError::NegativeBalance.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(DomainError::VersionConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            DomainError::SendInProgress("+998901234567".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DomainError::Delivery("Client not found".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let error = DomainError::Storage(anyhow::anyhow!("database is locked"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "Internal server error");
    }
}

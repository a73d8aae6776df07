//! Error types for the client core.

use thiserror::Error;

use crate::domain::advance_delta::DeltaRejection;
use crate::domain::currency::CurrencyError;

/// Shown when an advance write fails without a server explanation
pub const GENERIC_SUBMISSION_ERROR: &str = "Failed to update the advance. Please try again.";
/// Shown when a notice fails without a server explanation
pub const GENERIC_SEND_ERROR: &str = "Failed to send the notification.";
/// Shown when the server rejects a write because the event moved on
pub const STALE_VERSION_ERROR: &str =
    "The advance was changed elsewhere. The latest balance has been loaded; please review and retry.";

/// Failure talking to the event API or the rate provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never produced a response (connect error, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Server error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    /// The response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server-provided `detail` message, if the error carried one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Status { status: 409, .. })
    }

    /// Human-readable message: the server detail when present, otherwise `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail()
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Failure of an advance ledger operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Local validation failed; nothing was sent
    #[error(transparent)]
    Rejected(#[from] DeltaRejection),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// The new balance exceeds the event total and the user has not confirmed it
    #[error("The new advance {new_balance} exceeds the event total {total}; confirmation required")]
    ConfirmationRequired { new_balance: f64, total: f64 },

    /// Another submission for the same event has not resolved yet
    #[error("An advance update for event {0} is already in progress")]
    SubmissionInFlight(i64),

    #[error("Event {0} has not been loaded yet")]
    NotLoaded(i64),

    /// The server refused the write because the event version moved on
    #[error("{message}")]
    Conflict { message: String },

    /// The write was rejected or never completed; the local balance was left untouched
    #[error("{message}")]
    Submission {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to load event {event_id}: {source}")]
    Load {
        event_id: i64,
        #[source]
        source: ApiError,
    },
}

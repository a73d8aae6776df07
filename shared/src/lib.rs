use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Header carrying the client-generated key that lets the server drop replayed advance writes
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Direction of a single advance movement. "Set" never reaches the wire; it is
/// translated into one of these before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Subtract,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Subtract => "subtract",
        }
    }

    /// Signed multiplier applied to the delta amount
    pub fn sign(&self) -> f64 {
        match self {
            ChangeType::Add => 1.0,
            ChangeType::Subtract => -1.0,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ChangeType::Add),
            "subtract" => Ok(ChangeType::Subtract),
            other => Err(format!("Unknown change type: {}", other)),
        }
    }
}

/// One immutable line of an event's advance history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceHistoryEntry {
    pub amount: f64,
    pub change_type: ChangeType,
    pub date: DateTime<Utc>,
}

/// Event record as served by `GET /events/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// Display name of the client the event belongs to
    #[serde(default)]
    pub client_name: String,
    /// Client phone numbers, used as notification recipients
    #[serde(default)]
    pub phones: Vec<String>,
    /// Total due for the event
    pub amount: f64,
    /// Currency of `amount`: true = USD, false = local currency
    pub amount_money: bool,
    /// Paid-so-far balance
    pub advance: f64,
    /// Currency of `advance`: true = USD, false = local currency
    pub advance_money: bool,
    /// Append-only history, oldest first
    #[serde(default)]
    pub advance_history: Vec<AdvanceHistoryEntry>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Incremented on every advance write; used for optimistic concurrency
    #[serde(default)]
    pub version: i64,
}

/// Request to create an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub client_name: String,
    #[serde(default)]
    pub phones: Vec<String>,
    pub amount: f64,
    #[serde(default)]
    pub amount_money: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of `POST /events/{id}/update_advance/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAdvanceRequest {
    pub amount: f64,
    pub change_type: ChangeType,
    pub advance_money: bool,
    /// Last version the client saw; the write is rejected with 409 when it has moved on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

/// Response of the advance write. It does not carry the history; callers refetch the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceUpdateResponse {
    pub id: i64,
    pub advance: f64,
    pub advance_money: bool,
    pub version: i64,
}

/// Outcome of a notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Success,
    Error,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Success => "success",
            NotificationStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(NotificationStatus::Success),
            "error" => Ok(NotificationStatus::Error),
            other => Err(format!("Unknown notification status: {}", other)),
        }
    }
}

/// One line of the advance notification log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAttempt {
    /// Server ids are numeric strings; locally recorded attempts use a `local-` prefix
    pub id: String,
    pub phone: String,
    pub status: NotificationStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Body of `POST /events/{id}/send-advance-notification/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendNotificationResponse {
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error envelope used by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

/// Payload of the external exchange-rate provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRatesResponse {
    pub rates: HashMap<String, f64>,
}

use chrono::{DateTime, Utc};
use shared::ChangeType;

/// Domain model of an event and its advance
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub client_name: String,
    pub phones: Vec<String>,
    pub amount: f64,
    pub amount_money: bool,
    pub advance: f64,
    pub advance_money: bool,
    /// Oldest first
    pub advance_history: Vec<AdvanceEntry>,
    pub comment: Option<String>,
    pub version: i64,
}

impl Event {
    /// No money has moved yet, so the balance currency can still follow the first payment
    pub fn balance_currency_is_open(&self) -> bool {
        self.advance == 0.0 && self.advance_history.is_empty()
    }

    pub fn last_change(&self) -> Option<&AdvanceEntry> {
        self.advance_history.last()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceEntry {
    pub amount: f64,
    pub change_type: ChangeType,
    pub date: DateTime<Utc>,
}

/// Event as submitted for creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub client_name: String,
    pub phones: Vec<String>,
    pub amount: f64,
    pub amount_money: bool,
    pub comment: Option<String>,
}

/// One validated advance movement, applied atomically by storage
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceChange {
    pub event_id: i64,
    /// Version the change was computed against; storage refuses it if the row moved on
    pub base_version: i64,
    pub new_advance: f64,
    pub advance_money: bool,
    pub entry: AdvanceEntry,
    pub idempotency_key: Option<String>,
}

/// State of the advance right after a write
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceState {
    pub event_id: i64,
    pub advance: f64,
    pub advance_money: bool,
    pub version: i64,
}

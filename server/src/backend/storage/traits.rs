//! # Storage Traits
//!
//! Storage abstractions the domain services depend on. The SQLite
//! repositories implement them; tests can swap in their own.

use anyhow::Result;
use async_trait::async_trait;

use crate::backend::domain::models::event::{AdvanceChange, AdvanceState, Event, NewEvent};
use crate::backend::domain::models::notification::{NewNotificationRecord, NotificationRecord};

#[async_trait]
pub trait EventStorage: Send + Sync {
    async fn create_event(&self, event: &NewEvent) -> Result<Event>;

    /// Event with its full advance history, oldest first
    async fn get_event(&self, event_id: i64) -> Result<Option<Event>>;

    /// Stored outcome of an earlier write made with `idempotency_key`
    async fn find_advance_request(
        &self,
        event_id: i64,
        idempotency_key: &str,
    ) -> Result<Option<AdvanceState>>;

    /// Apply the balance update, the version bump, the history entry and the
    /// idempotency record as one unit.
    /// Returns `None` without changing anything when the event is no longer at
    /// `change.base_version`.
    async fn apply_advance_change(&self, change: &AdvanceChange) -> Result<Option<AdvanceState>>;
}

#[async_trait]
pub trait NotificationLogStorage: Send + Sync {
    async fn record_attempt(&self, record: &NewNotificationRecord) -> Result<NotificationRecord>;

    /// Log entries for the event, newest first
    async fn list_attempts(&self, event_id: i64) -> Result<Vec<NotificationRecord>>;
}

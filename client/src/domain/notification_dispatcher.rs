//! Payment notice dispatcher.
//!
//! Sends advance notices one recipient at a time. A single slot guards the
//! whole dispatcher: while one send is in flight every other send, to any
//! phone, is a silent no-op. Outcomes are recorded as a per-phone status and as
//! a local history entry; the server log is pulled in separately by
//! `refresh_log` and reconciled with `merge_history`.

use chrono::{Duration, Utc};
use shared::{NotificationAttempt, NotificationStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::reconciliation::{default_match_window, merge_history, new_local_id};
use super::single_flight::{lock, SingleFlight};
use crate::error::GENERIC_SEND_ERROR;
use crate::services::EventsApi;

/// Result of one send, as shown next to the phone number
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub phone: String,
    pub status: NotificationStatus,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        self.status == NotificationStatus::Success
    }
}

pub struct NotificationDispatcher<A: EventsApi> {
    api: Arc<A>,
    flight: SingleFlight,
    history: Mutex<HashMap<i64, Vec<NotificationAttempt>>>,
    statuses: Mutex<HashMap<String, SendOutcome>>,
    match_window: Duration,
}

impl<A: EventsApi> NotificationDispatcher<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            flight: SingleFlight::new(),
            history: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            match_window: default_match_window(),
        }
    }

    /// Override how far apart a local and a server entry may be and still count as the same attempt
    pub fn with_match_window(mut self, window: Duration) -> Self {
        self.match_window = window;
        self
    }

    /// Send the advance notice for `event_id` to `phone`.
    ///
    /// Returns `None` without doing anything when another send is in flight.
    /// Otherwise the outcome, success or failure, has been recorded by the time
    /// it is returned.
    pub async fn send_notification(&self, event_id: i64, phone: &str) -> Option<SendOutcome> {
        let permit = match self.flight.try_acquire(phone) {
            Some(permit) => permit,
            None => {
                debug!("Ignoring send to {}: another notice is in flight", phone);
                return None;
            }
        };

        info!("Sending advance notice for event {} to {}", event_id, phone);
        let outcome = match self.api.send_notification(event_id, phone).await {
            Ok(response) if response.status == NotificationStatus::Success => SendOutcome {
                phone: phone.to_string(),
                status: NotificationStatus::Success,
                error: None,
            },
            Ok(response) => SendOutcome {
                phone: phone.to_string(),
                status: NotificationStatus::Error,
                error: Some(
                    response
                        .detail
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_SEND_ERROR.to_string()),
                ),
            },
            Err(e) => {
                warn!("Advance notice for event {} to {} failed: {}", event_id, phone, e);
                SendOutcome {
                    phone: phone.to_string(),
                    status: NotificationStatus::Error,
                    error: Some(e.user_message(GENERIC_SEND_ERROR)),
                }
            }
        };

        self.record(event_id, &outcome);
        permit.release();
        Some(outcome)
    }

    fn record(&self, event_id: i64, outcome: &SendOutcome) {
        lock(&self.statuses).insert(outcome.phone.clone(), outcome.clone());
        lock(&self.history).entry(event_id).or_default().insert(
            0,
            NotificationAttempt {
                id: new_local_id(),
                phone: outcome.phone.clone(),
                status: outcome.status,
                error: outcome.error.clone(),
                sent_at: Utc::now(),
            },
        );
    }

    /// Pull the server log for `event_id` and reconcile the displayed history with it.
    ///
    /// A failed fetch is logged and leaves the history as it was. Returns whether
    /// the history was reconciled.
    pub async fn refresh_log(&self, event_id: i64) -> bool {
        match self.api.get_notification_log(event_id).await {
            Ok(log) => {
                let mut history = lock(&self.history);
                let current = history.remove(&event_id).unwrap_or_default();
                let merged = merge_history(&current, &log, self.match_window);
                debug!(
                    "Reconciled notice history for event {}: {} local, {} from server, {} shown",
                    event_id,
                    current.len(),
                    log.len(),
                    merged.len()
                );
                history.insert(event_id, merged);
                true
            }
            Err(e) => {
                warn!("Failed to fetch notice log for event {}: {}", event_id, e);
                false
            }
        }
    }

    /// Displayed history for the event, newest first
    pub fn history(&self, event_id: i64) -> Vec<NotificationAttempt> {
        lock(&self.history).get(&event_id).cloned().unwrap_or_default()
    }

    /// Outcome of the last send to `phone`
    pub fn status_for(&self, phone: &str) -> Option<SendOutcome> {
        lock(&self.statuses).get(phone).cloned()
    }

    pub fn sending_phone(&self) -> Option<String> {
        self.flight.holder()
    }

    pub fn is_sending(&self) -> bool {
        self.flight.is_held()
    }
}

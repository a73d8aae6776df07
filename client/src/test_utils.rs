//! In-memory `EventsApi` used by the domain tests.

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    AdvanceHistoryEntry, AdvanceUpdateResponse, Event, NotificationAttempt, NotificationStatus,
    SendNotificationResponse, UpdateAdvanceRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::ApiError;
use crate::services::EventsApi;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub event_id: i64,
    pub request: UpdateAdvanceRequest,
    pub idempotency_key: Option<String>,
}

#[derive(Default)]
struct FakeState {
    events: HashMap<i64, Event>,
    logs: HashMap<i64, Vec<NotificationAttempt>>,
    applied_keys: HashMap<String, AdvanceUpdateResponse>,
    updates: Vec<RecordedUpdate>,
    sends: Vec<(i64, String)>,
    get_calls: usize,
    fail_update: Option<ApiError>,
    fail_get: Option<ApiError>,
    fail_log: Option<ApiError>,
    send_failures: HashMap<String, ApiError>,
    next_log_id: i64,
}

/// Fake event API backed by a map. Writes behave like the real server
/// (balance, version, history, idempotency), and a gate can hold writes and
/// sends open so tests can observe in-flight behavior.
pub struct FakeEventsApi {
    state: Mutex<FakeState>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Arc<Notify>,
}

pub fn event(id: i64, amount: f64, advance: f64) -> Event {
    Event {
        id,
        client_name: "Dilnoza Karimova".to_string(),
        phones: vec!["+998901234567".to_string()],
        amount,
        amount_money: false,
        advance,
        advance_money: false,
        advance_history: Vec::new(),
        comment: None,
        version: 1,
    }
}

impl FakeEventsApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_log_id: 1,
                ..FakeState::default()
            }),
            gate: Mutex::new(None),
            entered: Arc::new(Notify::new()),
        }
    }

    pub fn with_event(event: Event) -> Self {
        let api = Self::new();
        api.insert_event(event);
        api
    }

    pub fn insert_event(&self, event: Event) {
        self.state.lock().unwrap().events.insert(event.id, event);
    }

    pub fn stored_event(&self, id: i64) -> Option<Event> {
        self.state.lock().unwrap().events.get(&id).cloned()
    }

    /// Move the stored balance without going through `update_advance`, as another client would
    pub fn bump_elsewhere(&self, id: i64, amount: f64) {
        let mut state = self.state.lock().unwrap();
        if let Some(event) = state.events.get_mut(&id) {
            event.advance += amount;
            event.version += 1;
            event.advance_history.push(AdvanceHistoryEntry {
                amount,
                change_type: shared::ChangeType::Add,
                date: Utc::now(),
            });
        }
    }

    pub fn set_log(&self, event_id: i64, log: Vec<NotificationAttempt>) {
        self.state.lock().unwrap().logs.insert(event_id, log);
    }

    pub fn fail_update(&self, error: Option<ApiError>) {
        self.state.lock().unwrap().fail_update = error;
    }

    pub fn fail_get(&self, error: Option<ApiError>) {
        self.state.lock().unwrap().fail_get = error;
    }

    pub fn fail_log(&self, error: Option<ApiError>) {
        self.state.lock().unwrap().fail_log = error;
    }

    pub fn fail_send_to(&self, phone: &str, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .send_failures
            .insert(phone.to_string(), error);
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn sends(&self) -> Vec<(i64, String)> {
        self.state.lock().unwrap().sends.clone()
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    /// Hold every subsequent write and send until the returned handle is notified
    pub fn hold_requests(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Resolves once a held write or send has reached the fake
    pub async fn request_entered(&self) {
        self.entered.notified().await;
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }
    }
}

#[async_trait]
impl EventsApi for FakeEventsApi {
    async fn get_event(&self, event_id: i64) -> Result<Event, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        if let Some(error) = state.fail_get.clone() {
            return Err(error);
        }
        state.events.get(&event_id).cloned().ok_or(ApiError::Status {
            status: 404,
            detail: Some("Event not found".to_string()),
        })
    }

    async fn update_advance(
        &self,
        event_id: i64,
        request: &UpdateAdvanceRequest,
        idempotency_key: Option<&str>,
    ) -> Result<AdvanceUpdateResponse, ApiError> {
        self.state.lock().unwrap().updates.push(RecordedUpdate {
            event_id,
            request: request.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
        });

        self.pass_gate().await;

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_update.clone() {
            return Err(error);
        }
        if let Some(stored) = idempotency_key.and_then(|k| state.applied_keys.get(k)) {
            return Ok(stored.clone());
        }

        let event = state.events.get_mut(&event_id).ok_or(ApiError::Status {
            status: 404,
            detail: Some("Event not found".to_string()),
        })?;

        if let Some(expected) = request.expected_version {
            if expected != event.version {
                return Err(ApiError::Status {
                    status: 409,
                    detail: Some("Advance was modified by another request".to_string()),
                });
            }
        }

        let new_balance = event.advance + request.change_type.sign() * request.amount;
        if new_balance < 0.0 {
            return Err(ApiError::Status {
                status: 400,
                detail: Some("Advance cannot become negative".to_string()),
            });
        }

        event.advance = new_balance;
        event.advance_money = request.advance_money;
        event.version += 1;
        event.advance_history.push(AdvanceHistoryEntry {
            amount: request.amount,
            change_type: request.change_type,
            date: Utc::now(),
        });

        let response = AdvanceUpdateResponse {
            id: event.id,
            advance: event.advance,
            advance_money: event.advance_money,
            version: event.version,
        };
        if let Some(key) = idempotency_key {
            state.applied_keys.insert(key.to_string(), response.clone());
        }
        Ok(response)
    }

    async fn get_notification_log(&self, event_id: i64) -> Result<Vec<NotificationAttempt>, ApiError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = state.fail_log.clone() {
            return Err(error);
        }
        Ok(state.logs.get(&event_id).cloned().unwrap_or_default())
    }

    async fn send_notification(
        &self,
        event_id: i64,
        phone: &str,
    ) -> Result<SendNotificationResponse, ApiError> {
        self.state
            .lock()
            .unwrap()
            .sends
            .push((event_id, phone.to_string()));

        self.pass_gate().await;

        let mut state = self.state.lock().unwrap();
        let id = state.next_log_id;
        state.next_log_id += 1;

        let outcome = state.send_failures.get(phone).cloned();
        let (status, error) = match &outcome {
            Some(e) => (NotificationStatus::Error, e.detail().map(str::to_string)),
            None => (NotificationStatus::Success, None),
        };
        state.logs.entry(event_id).or_default().insert(
            0,
            NotificationAttempt {
                id: id.to_string(),
                phone: phone.to_string(),
                status,
                error,
                sent_at: Utc::now(),
            },
        );

        match outcome {
            Some(e) => Err(e),
            None => Ok(SendNotificationResponse {
                status: NotificationStatus::Success,
                detail: None,
            }),
        }
    }
}

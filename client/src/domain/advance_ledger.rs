//! Advance ledger client.
//!
//! Holds a cached snapshot of each loaded event's advance and applies deltas
//! against the server with a submit-then-refetch protocol: the write endpoint
//! does not return the history, so every successful write is followed by a full
//! read of the event. A failed write never touches the cached snapshot.
//!
//! Submissions are serialized per event. Each carries an idempotency key and the
//! version of the snapshot it was computed from, so the server can drop replays
//! and refuse deltas computed against a stale balance.

use chrono::Utc;
use shared::{AdvanceHistoryEntry, AdvanceUpdateResponse, ChangeType, Event, UpdateAdvanceRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::advance_delta::{compute_delta, AdvanceDelta, AdvanceOperation, DeltaRejection};
use super::currency::{convert, ExchangeRate};
use super::single_flight::{lock, KeyedSingleFlight};
use crate::error::{LedgerError, GENERIC_SUBMISSION_ERROR, STALE_VERSION_ERROR};
use crate::services::EventsApi;

/// Client-side view of an event's advance
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceSnapshot {
    pub event_id: i64,
    pub total: f64,
    pub total_is_usd: bool,
    pub advance: f64,
    pub advance_is_usd: bool,
    /// Oldest first
    pub history: Vec<AdvanceHistoryEntry>,
    pub version: i64,
}

impl AdvanceSnapshot {
    /// A fresh balance has no currency of its own yet and takes whatever the first payment uses
    pub fn currency_is_open(&self) -> bool {
        self.advance == 0.0 && self.history.is_empty()
    }

    pub fn remaining(&self, rate: Option<ExchangeRate>) -> Option<f64> {
        convert(self.total, rate, self.total_is_usd, self.advance_is_usd)
            .ok()
            .map(|total| total - self.advance)
    }
}

impl From<Event> for AdvanceSnapshot {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.id,
            total: event.amount,
            total_is_usd: event.amount_money,
            advance: event.advance,
            advance_is_usd: event.advance_money,
            history: event.advance_history,
            version: event.version,
        }
    }
}

/// A validated delta, ready to submit
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDelta {
    pub event_id: i64,
    pub delta: AdvanceDelta,
    /// Currency of the balance the delta applies to
    pub currency_is_usd: bool,
    /// Event total expressed in the balance currency
    pub total_in_balance_currency: f64,
    pub expected_version: Option<i64>,
    /// Reused on every retry of this delta so the server applies it at most once
    pub idempotency_key: String,
}

impl PreparedDelta {
    /// The new balance exceeds the event total; the user has to confirm before submitting
    pub fn requires_confirmation(&self) -> bool {
        self.delta.exceeds_total
    }

    fn request(&self) -> UpdateAdvanceRequest {
        UpdateAdvanceRequest {
            amount: self.delta.amount,
            change_type: self.delta.change_type,
            advance_money: self.currency_is_usd,
            expected_version: self.expected_version,
        }
    }
}

pub struct AdvanceLedger<A: EventsApi> {
    api: Arc<A>,
    snapshots: Mutex<HashMap<i64, AdvanceSnapshot>>,
    in_flight: KeyedSingleFlight<i64>,
}

impl<A: EventsApi> AdvanceLedger<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            snapshots: Mutex::new(HashMap::new()),
            in_flight: KeyedSingleFlight::new(),
        }
    }

    /// Fetch the event and replace the cached snapshot with the server's view
    pub async fn load(&self, event_id: i64) -> Result<AdvanceSnapshot, LedgerError> {
        let event = self.api.get_event(event_id).await.map_err(|source| {
            warn!("Failed to load event {}: {}", event_id, source);
            LedgerError::Load { event_id, source }
        })?;

        let snapshot = AdvanceSnapshot::from(event);
        lock(&self.snapshots).insert(event_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Last reconciled snapshot, if the event has been loaded
    pub fn snapshot(&self, event_id: i64) -> Option<AdvanceSnapshot> {
        lock(&self.snapshots).get(&event_id).cloned()
    }

    pub fn is_submitting(&self, event_id: i64) -> bool {
        self.in_flight.is_held(&event_id)
    }

    /// Validate `operation` with `amount` (entered in USD when `input_is_usd`)
    /// against the cached snapshot and compute what to submit.
    ///
    /// Amounts in the other currency are converted into the balance currency
    /// first, which needs `rate`. Nothing is sent.
    pub fn prepare(
        &self,
        event_id: i64,
        operation: AdvanceOperation,
        amount: f64,
        input_is_usd: bool,
        rate: Option<ExchangeRate>,
    ) -> Result<PreparedDelta, LedgerError> {
        let snapshot = self.snapshot(event_id).ok_or(LedgerError::NotLoaded(event_id))?;

        if !amount.is_finite() || amount <= 0.0 {
            return Err(DeltaRejection::InvalidAmount.into());
        }

        let currency_is_usd = if snapshot.currency_is_open() {
            input_is_usd
        } else {
            snapshot.advance_is_usd
        };

        let amount = convert(amount, rate, input_is_usd, currency_is_usd)?;
        let total = convert(snapshot.total, rate, snapshot.total_is_usd, currency_is_usd)?;
        let delta = compute_delta(snapshot.advance, total, operation, amount)?;

        Ok(PreparedDelta {
            event_id,
            delta,
            currency_is_usd,
            total_in_balance_currency: total,
            expected_version: Some(snapshot.version),
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }

    /// Submit a prepared delta. Over-total deltas need `confirmed`; without it
    /// nothing is sent.
    pub async fn submit(
        &self,
        prepared: &PreparedDelta,
        confirmed: bool,
    ) -> Result<AdvanceSnapshot, LedgerError> {
        if prepared.requires_confirmation() && !confirmed {
            return Err(LedgerError::ConfirmationRequired {
                new_balance: prepared.delta.new_balance,
                total: prepared.total_in_balance_currency,
            });
        }

        self.submit_request(prepared.event_id, prepared.request(), &prepared.idempotency_key)
            .await
    }

    /// Apply an already computed delta and return the reconciled snapshot.
    ///
    /// Callers are expected to have validated the delta and handled the
    /// over-total confirmation themselves.
    pub async fn apply_delta(
        &self,
        event_id: i64,
        delta_amount: f64,
        change_type: ChangeType,
        currency_is_usd: bool,
    ) -> Result<AdvanceSnapshot, LedgerError> {
        if !delta_amount.is_finite() || delta_amount <= 0.0 {
            return Err(DeltaRejection::InvalidAmount.into());
        }

        let request = UpdateAdvanceRequest {
            amount: delta_amount,
            change_type,
            advance_money: currency_is_usd,
            expected_version: self.snapshot(event_id).map(|s| s.version),
        };
        let key = Uuid::new_v4().to_string();
        self.submit_request(event_id, request, &key).await
    }

    async fn submit_request(
        &self,
        event_id: i64,
        request: UpdateAdvanceRequest,
        idempotency_key: &str,
    ) -> Result<AdvanceSnapshot, LedgerError> {
        let _permit = self
            .in_flight
            .try_acquire(event_id)
            .ok_or(LedgerError::SubmissionInFlight(event_id))?;

        info!(
            "Submitting advance {} of {} for event {} (key {})",
            request.change_type, request.amount, event_id, idempotency_key
        );

        let response = match self
            .api
            .update_advance(event_id, &request, Some(idempotency_key))
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_conflict() => {
                warn!("Advance write for event {} hit a stale version: {}", event_id, e);
                if let Err(reload) = self.load(event_id).await {
                    warn!("Reload after conflict failed: {}", reload);
                }
                return Err(LedgerError::Conflict {
                    message: STALE_VERSION_ERROR.to_string(),
                });
            }
            Err(e) => {
                error!("Advance write for event {} failed: {}", event_id, e);
                return Err(LedgerError::Submission {
                    message: e.user_message(GENERIC_SUBMISSION_ERROR),
                    source: e,
                });
            }
        };

        match self.api.get_event(event_id).await {
            Ok(event) => {
                let snapshot = AdvanceSnapshot::from(event);
                lock(&self.snapshots).insert(event_id, snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    "Advance for event {} was written but the refetch failed, showing local state: {}",
                    event_id, e
                );
                Ok(self.apply_locally(event_id, &request, &response))
            }
        }
    }

    /// Fold a successful write into the cached snapshot when the authoritative read is unavailable
    fn apply_locally(
        &self,
        event_id: i64,
        request: &UpdateAdvanceRequest,
        response: &AdvanceUpdateResponse,
    ) -> AdvanceSnapshot {
        let mut snapshots = lock(&self.snapshots);
        let snapshot = snapshots.entry(event_id).or_insert_with(|| AdvanceSnapshot {
            event_id,
            total: 0.0,
            total_is_usd: response.advance_money,
            advance: 0.0,
            advance_is_usd: response.advance_money,
            history: Vec::new(),
            version: 0,
        });

        // A replayed write answers with the state it produced back then, which
        // the snapshot already includes
        if response.version <= snapshot.version {
            debug!(
                "Write for event {} replayed version {}; keeping snapshot at version {}",
                event_id, response.version, snapshot.version
            );
            return snapshot.clone();
        }

        snapshot.advance = response.advance;
        snapshot.advance_is_usd = response.advance_money;
        snapshot.version = response.version;
        snapshot.history.push(AdvanceHistoryEntry {
            amount: request.amount,
            change_type: request.change_type,
            date: Utc::now(),
        });
        snapshot.clone()
    }
}

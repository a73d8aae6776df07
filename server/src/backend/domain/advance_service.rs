//! Server side of the advance write.
//!
//! A write is one add or subtract movement. It is checked against the stored
//! balance, then the balance update, version bump, history entry and
//! idempotency record are committed together. Writes carrying a key that was
//! already applied return the stored outcome and change nothing.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::commands::advance::UpdateAdvanceCommand;
use super::errors::DomainError;
use super::models::event::{AdvanceChange, AdvanceEntry, AdvanceState};
use crate::backend::storage::EventStorage;

#[derive(Clone)]
pub struct AdvanceService {
    storage: Arc<dyn EventStorage>,
    local_currency: String,
}

impl AdvanceService {
    pub fn new(storage: Arc<dyn EventStorage>, local_currency: String) -> Self {
        Self {
            storage,
            local_currency,
        }
    }

    pub async fn update_advance(
        &self,
        command: UpdateAdvanceCommand,
    ) -> Result<AdvanceState, DomainError> {
        if !command.amount.is_finite() || command.amount <= 0.0 {
            return Err(DomainError::InvalidAmount);
        }

        if let Some(state) = self.replayed(&command).await? {
            return Ok(state);
        }

        let event = self
            .storage
            .get_event(command.event_id)
            .await?
            .ok_or(DomainError::EventNotFound(command.event_id))?;

        if let Some(expected) = command.expected_version {
            if expected != event.version {
                warn!(
                    "Rejecting advance write for event {}: expected version {}, stored {}",
                    event.id, expected, event.version
                );
                return Err(DomainError::VersionConflict);
            }
        }

        if !event.balance_currency_is_open() && command.advance_money != event.advance_money {
            let expected = if event.advance_money {
                "USD".to_string()
            } else {
                self.local_currency.clone()
            };
            return Err(DomainError::CurrencyMismatch { expected });
        }

        let new_advance = event.advance + command.change_type.sign() * command.amount;
        if new_advance < 0.0 {
            return Err(DomainError::NegativeBalance);
        }

        let change = AdvanceChange {
            event_id: event.id,
            base_version: event.version,
            new_advance,
            advance_money: command.advance_money,
            entry: AdvanceEntry {
                amount: command.amount,
                change_type: command.change_type,
                date: Utc::now(),
            },
            idempotency_key: command.idempotency_key.clone(),
        };

        match self.storage.apply_advance_change(&change).await? {
            Some(state) => {
                info!(
                    "Advance of event {} {} {} -> {} (version {})",
                    event.id, command.change_type, command.amount, state.advance, state.version
                );
                Ok(state)
            }
            // Another write landed between the read and the update
            None => match self.replayed(&command).await? {
                Some(state) => Ok(state),
                None => Err(DomainError::VersionConflict),
            },
        }
    }

    async fn replayed(
        &self,
        command: &UpdateAdvanceCommand,
    ) -> Result<Option<AdvanceState>, DomainError> {
        let key = match &command.idempotency_key {
            Some(key) => key,
            None => return Ok(None),
        };

        let stored = self
            .storage
            .find_advance_request(command.event_id, key)
            .await?;
        if stored.is_some() {
            info!(
                "Replaying advance write for event {} (key {})",
                command.event_id, key
            );
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::event::NewEvent;
    use crate::backend::storage::{DbConnection, EventRepository};
    use shared::ChangeType;

    async fn setup(advance: f64) -> (AdvanceService, Arc<EventRepository>, i64) {
        let db = DbConnection::in_memory().await.expect("Failed to init test DB");
        let repo = Arc::new(EventRepository::new(db));
        let event = repo
            .create_event(&NewEvent {
                client_name: "Aziz".to_string(),
                phones: vec![],
                amount: 1_000.0,
                amount_money: false,
                comment: None,
            })
            .await
            .unwrap();

        let service = AdvanceService::new(repo.clone(), "UZS".to_string());
        if advance > 0.0 {
            service.update_advance(command(event.id, advance, ChangeType::Add)).await.unwrap();
        }
        (service, repo, event.id)
    }

    fn command(event_id: i64, amount: f64, change_type: ChangeType) -> UpdateAdvanceCommand {
        UpdateAdvanceCommand {
            event_id,
            amount,
            change_type,
            advance_money: false,
            expected_version: None,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_subtract() {
        let (service, repo, id) = setup(200.0).await;

        let state = service.update_advance(command(id, 300.0, ChangeType::Add)).await.unwrap();
        assert_eq!(state.advance, 500.0);

        let state = service
            .update_advance(command(id, 500.0, ChangeType::Subtract))
            .await
            .unwrap();
        assert_eq!(state.advance, 0.0);

        let event = repo.get_event(id).await.unwrap().unwrap();
        assert_eq!(event.advance_history.len(), 3);
        assert_eq!(event.version, 4);
    }

    #[tokio::test]
    async fn test_rejections_change_nothing() {
        let (service, repo, id) = setup(200.0).await;

        for amount in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                service.update_advance(command(id, amount, ChangeType::Add)).await,
                Err(DomainError::InvalidAmount)
            ));
        }
        assert!(matches!(
            service.update_advance(command(id, 250.0, ChangeType::Subtract)).await,
            Err(DomainError::NegativeBalance)
        ));

        let mut usd = command(id, 10.0, ChangeType::Add);
        usd.advance_money = true;
        match service.update_advance(usd).await {
            Err(DomainError::CurrencyMismatch { expected }) => assert_eq!(expected, "UZS"),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            service.update_advance(command(id + 1, 10.0, ChangeType::Add)).await,
            Err(DomainError::EventNotFound(_))
        ));

        let event = repo.get_event(id).await.unwrap().unwrap();
        assert_eq!(event.advance, 200.0);
        assert_eq!(event.advance_history.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_balance_takes_first_currency() {
        let (service, _repo, id) = setup(0.0).await;

        let mut usd = command(id, 50.0, ChangeType::Add);
        usd.advance_money = true;
        let state = service.update_advance(usd).await.unwrap();

        assert!(state.advance_money);
        assert_eq!(state.advance, 50.0);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_a_conflict() {
        let (service, repo, id) = setup(200.0).await;

        let mut stale = command(id, 100.0, ChangeType::Add);
        stale.expected_version = Some(1);
        assert!(matches!(
            service.update_advance(stale).await,
            Err(DomainError::VersionConflict)
        ));

        let mut current = command(id, 100.0, ChangeType::Add);
        current.expected_version = Some(2);
        assert_eq!(service.update_advance(current).await.unwrap().version, 3);
        assert_eq!(repo.get_event(id).await.unwrap().unwrap().advance, 300.0);
    }

    #[tokio::test]
    async fn test_repeated_key_is_applied_once() {
        let (service, repo, id) = setup(200.0).await;

        let mut keyed = command(id, 100.0, ChangeType::Add);
        keyed.idempotency_key = Some("4f1c1e0a-7d2b-4c51-9a55-0f5b8f3f2b10".to_string());
        keyed.expected_version = Some(2);

        let first = service.update_advance(keyed.clone()).await.unwrap();
        let second = service.update_advance(keyed).await.unwrap();

        assert_eq!(first, second);
        let event = repo.get_event(id).await.unwrap().unwrap();
        assert_eq!(event.advance, 300.0);
        assert_eq!(event.advance_history.len(), 2);
    }
}

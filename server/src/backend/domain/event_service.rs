use std::sync::Arc;
use tracing::info;

use super::commands::events::CreateEventCommand;
use super::errors::DomainError;
use super::models::event::{Event, NewEvent};
use crate::backend::storage::EventStorage;

/// Event creation and lookup
#[derive(Clone)]
pub struct EventService {
    storage: Arc<dyn EventStorage>,
}

impl EventService {
    pub fn new(storage: Arc<dyn EventStorage>) -> Self {
        Self { storage }
    }

    /// Create an event with a zero advance kept in the total's currency
    pub async fn create_event(&self, command: CreateEventCommand) -> Result<Event, DomainError> {
        let client_name = command.client_name.trim().to_string();
        if client_name.is_empty() {
            return Err(DomainError::Validation("Client name is required".to_string()));
        }
        if !command.amount.is_finite() || command.amount < 0.0 {
            return Err(DomainError::Validation(
                "Total amount must be a non-negative number".to_string(),
            ));
        }

        let new_event = NewEvent {
            client_name,
            phones: command
                .phones
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            amount: command.amount,
            amount_money: command.amount_money,
            comment: command.comment.filter(|c| !c.trim().is_empty()),
        };

        let event = self.storage.create_event(&new_event).await?;
        info!("Created event {} for {}", event.id, event.client_name);
        Ok(event)
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Event, DomainError> {
        self.storage
            .get_event(event_id)
            .await?
            .ok_or(DomainError::EventNotFound(event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{DbConnection, EventRepository};

    async fn service() -> EventService {
        let db = DbConnection::in_memory().await.expect("Failed to init test DB");
        EventService::new(Arc::new(EventRepository::new(db)))
    }

    fn command(name: &str, amount: f64) -> CreateEventCommand {
        CreateEventCommand {
            client_name: name.to_string(),
            phones: vec![" +998901234567 ".to_string(), "".to_string()],
            amount,
            amount_money: true,
            comment: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_event_normalizes_input() {
        let service = service().await;

        let event = service.create_event(command("  Nodira  ", 2_500.0)).await.unwrap();

        assert_eq!(event.client_name, "Nodira");
        assert_eq!(event.phones, vec!["+998901234567".to_string()]);
        assert_eq!(event.comment, None);
        assert_eq!(event.advance, 0.0);
        assert!(event.advance_money);
        assert_eq!(service.get_event(event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_create_event_validation() {
        let service = service().await;

        assert!(matches!(
            service.create_event(command(" ", 100.0)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.create_event(command("Nodira", -1.0)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let service = service().await;
        assert!(matches!(
            service.get_event(404).await,
            Err(DomainError::EventNotFound(404))
        ));
    }
}

//! Sending advance notices and keeping the notification log.
//!
//! Every attempt that reaches the delivery stage (and every rejected phone
//! number) leaves one log entry. Only one send per phone number may be in
//! flight; a second request for the same number is refused without a log
//! entry.

use chrono::Utc;
use shared::NotificationStatus;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use super::commands::notifications::SendNotificationCommand;
use super::errors::DomainError;
use super::message_templates::advance_notice;
use super::models::notification::{NewNotificationRecord, NotificationRecord};
use super::phone::normalize_phone;
use crate::backend::io::messaging::MessageChannel;
use crate::backend::storage::{EventStorage, NotificationLogStorage};

#[derive(Clone)]
pub struct NotificationService {
    events: Arc<dyn EventStorage>,
    log: Arc<dyn NotificationLogStorage>,
    channel: Arc<dyn MessageChannel>,
    sending: Arc<Mutex<HashSet<String>>>,
    local_currency: String,
}

/// Marks a phone number as busy until dropped
struct SendingGuard {
    sending: Arc<Mutex<HashSet<String>>>,
    phone: String,
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        lock(&self.sending).remove(&self.phone);
    }
}

fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NotificationService {
    pub fn new(
        events: Arc<dyn EventStorage>,
        log: Arc<dyn NotificationLogStorage>,
        channel: Arc<dyn MessageChannel>,
        local_currency: String,
    ) -> Self {
        Self {
            events,
            log,
            channel,
            sending: Arc::new(Mutex::new(HashSet::new())),
            local_currency,
        }
    }

    /// Render the notice for the event's current advance and deliver it to `phone`
    pub async fn send(&self, command: SendNotificationCommand) -> Result<(), DomainError> {
        let event = self
            .events
            .get_event(command.event_id)
            .await?
            .ok_or(DomainError::EventNotFound(command.event_id))?;

        let phone = match normalize_phone(&command.phone) {
            Ok(phone) => phone,
            Err(e) => {
                warn!("Rejected phone {:?} for event {}", command.phone, event.id);
                self.record(event.id, command.phone.trim(), Some(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let _guard = self
            .try_mark_sending(&phone)
            .ok_or_else(|| DomainError::SendInProgress(phone.clone()))?;

        let text = advance_notice(&event, &self.local_currency, Utc::now());
        match self.channel.send(&phone, &text).await {
            Ok(()) => {
                info!("Advance notice for event {} sent to {}", event.id, phone);
                self.record(event.id, &phone, None).await;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    "Advance notice for event {} to {} failed: {}",
                    event.id, phone, message
                );
                self.record(event.id, &phone, Some(message.clone())).await;
                Err(DomainError::Delivery(message))
            }
        }
    }

    pub async fn list_log(&self, event_id: i64) -> Result<Vec<NotificationRecord>, DomainError> {
        if self.events.get_event(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound(event_id));
        }
        Ok(self.log.list_attempts(event_id).await?)
    }

    fn try_mark_sending(&self, phone: &str) -> Option<SendingGuard> {
        let mut sending = lock(&self.sending);
        if !sending.insert(phone.to_string()) {
            return None;
        }
        Some(SendingGuard {
            sending: self.sending.clone(),
            phone: phone.to_string(),
        })
    }

    /// A failed log write never changes the outcome of the send
    async fn record(&self, event_id: i64, phone: &str, error_message: Option<String>) {
        let record = NewNotificationRecord {
            event_id,
            phone: phone.to_string(),
            status: if error_message.is_some() {
                NotificationStatus::Error
            } else {
                NotificationStatus::Success
            },
            error: error_message,
            sent_at: Utc::now(),
        };

        if let Err(e) = self.log.record_attempt(&record).await {
            error!("Failed to record notification for event {}: {}", event_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::event::NewEvent;
    use crate::backend::io::messaging::ChannelError;
    use crate::backend::storage::{DbConnection, EventRepository, NotificationRepository};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Records every delivery; can refuse all of them or hold them until released
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(String, String)>>,
        reject_with: Option<String>,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    #[async_trait]
    impl MessageChannel for RecordingChannel {
        async fn send(&self, phone: &str, text: &str) -> Result<(), ChannelError> {
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if let Some(message) = &self.reject_with {
                return Err(ChannelError::Rejected(message.clone()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), text.to_string()));
            Ok(())
        }
    }

    async fn setup(channel: Arc<RecordingChannel>) -> (NotificationService, i64) {
        let db = DbConnection::in_memory().await.expect("Failed to init test DB");
        let events = Arc::new(EventRepository::new(db.clone()));
        let event = events
            .create_event(&NewEvent {
                client_name: "Dilnoza".to_string(),
                phones: vec!["+998901234567".to_string()],
                amount: 3_000_000.0,
                amount_money: false,
                comment: None,
            })
            .await
            .unwrap();

        let service = NotificationService::new(
            events,
            Arc::new(NotificationRepository::new(db)),
            channel,
            "UZS".to_string(),
        );
        (service, event.id)
    }

    fn command(event_id: i64, phone: &str) -> SendNotificationCommand {
        SendNotificationCommand {
            event_id,
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_send_is_logged() {
        let channel = Arc::new(RecordingChannel::default());
        let (service, id) = setup(channel.clone()).await;

        service.send(command(id, "90 123 45 67")).await.unwrap();

        let sent = channel.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+998901234567");
        assert!(sent[0].1.contains("Client: Dilnoza"));

        let log = service.list_log(id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].phone, "+998901234567");
        assert_eq!(log[0].status, NotificationStatus::Success);
        assert_eq!(log[0].error, None);
    }

    #[tokio::test]
    async fn test_invalid_phone_is_logged_and_not_sent() {
        let channel = Arc::new(RecordingChannel::default());
        let (service, id) = setup(channel.clone()).await;

        let result = service.send(command(id, "12345")).await;

        assert!(matches!(result, Err(DomainError::InvalidPhone(_))));
        assert!(channel.sent.lock().unwrap().is_empty());
        let log = service.list_log(id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].phone, "12345");
        assert_eq!(log[0].status, NotificationStatus::Error);
        assert_eq!(
            log[0].error.as_deref(),
            Some("Invalid phone number format. Expected +998XXXXXXXXX")
        );
    }

    #[tokio::test]
    async fn test_gateway_rejection_is_logged() {
        let channel = Arc::new(RecordingChannel {
            reject_with: Some("Client not found".to_string()),
            ..Default::default()
        });
        let (service, id) = setup(channel).await;

        match service.send(command(id, "+998901234567")).await {
            Err(DomainError::Delivery(message)) => assert_eq!(message, "Client not found"),
            other => panic!("unexpected result: {:?}", other),
        }

        let log = service.list_log(id).await.unwrap();
        assert_eq!(log[0].status, NotificationStatus::Error);
        assert_eq!(log[0].error.as_deref(), Some("Client not found"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_logged() {
        let channel = Arc::new(RecordingChannel::default());
        let (service, id) = setup(channel).await;

        assert!(matches!(
            service.send(command(id + 10, "+998901234567")).await,
            Err(DomainError::EventNotFound(_))
        ));
        assert!(matches!(
            service.list_log(id + 10).await,
            Err(DomainError::EventNotFound(_))
        ));
        assert!(service.list_log(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_phone_is_refused_while_sending() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let channel = Arc::new(RecordingChannel {
            gate: Some((entered.clone(), release.clone())),
            ..Default::default()
        });
        let (service, id) = setup(channel.clone()).await;

        let first = service.send(command(id, "+998901234567"));
        let second = async {
            entered.notified().await;
            let busy = service.send(command(id, "998901234567")).await;
            release.notify_one();
            busy
        };
        let (first, busy) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(busy, Err(DomainError::SendInProgress(_))));
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
        assert_eq!(service.list_log(id).await.unwrap().len(), 1);

        // Released once the first send finished
        let entered_again = entered.clone();
        let release_again = release.clone();
        let (again, _) = tokio::join!(service.send(command(id, "+998901234567")), async move {
            entered_again.notified().await;
            release_again.notify_one();
        });
        assert!(again.is_ok());
    }
}

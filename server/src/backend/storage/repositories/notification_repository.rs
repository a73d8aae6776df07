use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::Row;
use shared::NotificationStatus;

use super::{format_timestamp, parse_timestamp};
use crate::backend::domain::models::notification::{NewNotificationRecord, NotificationRecord};
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::traits::NotificationLogStorage;

/// Repository for the advance notification log
#[derive(Clone)]
pub struct NotificationRepository {
    db: DbConnection,
}

impl NotificationRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationLogStorage for NotificationRepository {
    async fn record_attempt(&self, record: &NewNotificationRecord) -> Result<NotificationRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO notification_log (event_id, phone, status, error, sent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.event_id)
        .bind(&record.phone)
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(format_timestamp(&record.sent_at))
        .execute(self.db.pool())
        .await?;

        Ok(NotificationRecord {
            id: result.last_insert_rowid(),
            event_id: record.event_id,
            phone: record.phone.clone(),
            status: record.status,
            error: record.error.clone(),
            sent_at: record.sent_at,
        })
    }

    async fn list_attempts(&self, event_id: i64) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, phone, status, error, sent_at
            FROM notification_log
            WHERE event_id = ?
            ORDER BY sent_at DESC, id DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<NotificationRecord> {
                let status: String = row.get("status");
                let sent_at: String = row.get("sent_at");
                Ok(NotificationRecord {
                    id: row.get("id"),
                    event_id: row.get("event_id"),
                    phone: row.get("phone"),
                    status: status
                        .parse::<NotificationStatus>()
                        .map_err(|e| anyhow!(e))?,
                    error: row.get("error"),
                    sent_at: parse_timestamp(&sent_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::event::NewEvent;
    use crate::backend::storage::repositories::EventRepository;
    use crate::backend::storage::traits::EventStorage;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_log_is_listed_newest_first() {
        let db = DbConnection::in_memory().await.expect("Failed to init test DB");
        let events = EventRepository::new(db.clone());
        let log = NotificationRepository::new(db);

        let event = events
            .create_event(&NewEvent {
                client_name: "Malika".to_string(),
                phones: vec![],
                amount: 500.0,
                amount_money: true,
                comment: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let older = log
            .record_attempt(&NewNotificationRecord {
                event_id: event.id,
                phone: "+998901111111".to_string(),
                status: NotificationStatus::Error,
                error: Some("Client not found".to_string()),
                sent_at: now - Duration::minutes(5),
            })
            .await
            .unwrap();
        let newer = log
            .record_attempt(&NewNotificationRecord {
                event_id: event.id,
                phone: "+998901111111".to_string(),
                status: NotificationStatus::Success,
                error: None,
                sent_at: now,
            })
            .await
            .unwrap();

        let listed = log.list_attempts(event.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
        assert_eq!(listed[1].error.as_deref(), Some("Client not found"));
        assert!(log.list_attempts(event.id + 1).await.unwrap().is_empty());
    }
}

use chrono::{DateTime, Utc};
use shared::NotificationStatus;

/// One line of the advance notification log
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub id: i64,
    pub event_id: i64,
    pub phone: String,
    pub status: NotificationStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotificationRecord {
    pub event_id: i64,
    pub phone: String,
    pub status: NotificationStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

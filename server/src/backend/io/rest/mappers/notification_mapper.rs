use crate::backend::domain::models::notification::NotificationRecord;
use shared::NotificationAttempt;

pub struct NotificationMapper;

impl NotificationMapper {
    /// Log ids go out as strings so clients can tell them apart from their own `local-` ids
    pub fn to_dto(record: NotificationRecord) -> NotificationAttempt {
        NotificationAttempt {
            id: record.id.to_string(),
            phone: record.phone,
            status: record.status,
            error: record.error,
            sent_at: record.sent_at,
        }
    }

    pub fn to_log_dto(records: Vec<NotificationRecord>) -> Vec<NotificationAttempt> {
        records.into_iter().map(Self::to_dto).collect()
    }
}

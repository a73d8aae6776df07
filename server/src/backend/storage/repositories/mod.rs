pub mod event_repository;
pub mod notification_repository;

pub use event_repository::EventRepository;
pub use notification_repository::NotificationRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid stored timestamp: {}", value))?;
    Ok(parsed.with_timezone(&Utc))
}

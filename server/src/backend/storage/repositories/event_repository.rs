use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::ChangeType;

use super::{format_timestamp, parse_timestamp};
use crate::backend::domain::models::event::{AdvanceChange, AdvanceEntry, AdvanceState, Event, NewEvent};
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::traits::EventStorage;

/// Repository for events, their advance history and idempotency records
#[derive(Clone)]
pub struct EventRepository {
    db: DbConnection,
}

impl EventRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    async fn load_history(&self, event_id: i64) -> Result<Vec<AdvanceEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT amount, change_type, date
            FROM advance_history
            WHERE event_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<AdvanceEntry> {
                let change_type: String = row.get("change_type");
                let date: String = row.get("date");
                Ok(AdvanceEntry {
                    amount: row.get("amount"),
                    change_type: change_type
                        .parse::<ChangeType>()
                        .map_err(|e| anyhow!(e))?,
                    date: parse_timestamp(&date)?,
                })
            })
            .collect()
    }
}

fn event_from_row(row: &SqliteRow, advance_history: Vec<AdvanceEntry>) -> Result<Event> {
    let phones: String = row.get("phones");
    Ok(Event {
        id: row.get("id"),
        client_name: row.get("client_name"),
        phones: serde_json::from_str(&phones).context("Invalid stored phone list")?,
        amount: row.get("amount"),
        amount_money: row.get("amount_money"),
        advance: row.get("advance"),
        advance_money: row.get("advance_money"),
        advance_history,
        comment: row.get("comment"),
        version: row.get("version"),
    })
}

#[async_trait]
impl EventStorage for EventRepository {
    async fn create_event(&self, event: &NewEvent) -> Result<Event> {
        let phones = serde_json::to_string(&event.phones)?;
        let result = sqlx::query(
            r#"
            INSERT INTO events (client_name, phones, amount, amount_money, advance, advance_money, comment, version, created_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, 1, ?)
            "#,
        )
        .bind(&event.client_name)
        .bind(&phones)
        .bind(event.amount)
        .bind(event.amount_money)
        .bind(event.amount_money)
        .bind(&event.comment)
        .bind(format_timestamp(&Utc::now()))
        .execute(self.db.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_event(id)
            .await?
            .ok_or_else(|| anyhow!("Event {} vanished right after insert", id))
    }

    async fn get_event(&self, event_id: i64) -> Result<Option<Event>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_name, phones, amount, amount_money, advance, advance_money, comment, version
            FROM events
            WHERE id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let history = self.load_history(event_id).await?;
                Ok(Some(event_from_row(&r, history)?))
            }
            None => Ok(None),
        }
    }

    async fn find_advance_request(
        &self,
        event_id: i64,
        idempotency_key: &str,
    ) -> Result<Option<AdvanceState>> {
        let row = sqlx::query(
            r#"
            SELECT advance, advance_money, version
            FROM advance_requests
            WHERE event_id = ? AND idempotency_key = ?
            "#,
        )
        .bind(event_id)
        .bind(idempotency_key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| AdvanceState {
            event_id,
            advance: r.get("advance"),
            advance_money: r.get("advance_money"),
            version: r.get("version"),
        }))
    }

    async fn apply_advance_change(&self, change: &AdvanceChange) -> Result<Option<AdvanceState>> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE events
            SET advance = ?, advance_money = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(change.new_advance)
        .bind(change.advance_money)
        .bind(change.event_id)
        .bind(change.base_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO advance_history (event_id, amount, change_type, date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(change.event_id)
        .bind(change.entry.amount)
        .bind(change.entry.change_type.as_str())
        .bind(format_timestamp(&change.entry.date))
        .execute(&mut *tx)
        .await?;

        let state = AdvanceState {
            event_id: change.event_id,
            advance: change.new_advance,
            advance_money: change.advance_money,
            version: change.base_version + 1,
        };

        if let Some(key) = &change.idempotency_key {
            sqlx::query(
                r#"
                INSERT INTO advance_requests (event_id, idempotency_key, advance, advance_money, version, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(change.event_id)
            .bind(key)
            .bind(state.advance)
            .bind(state.advance_money)
            .bind(state.version)
            .bind(format_timestamp(&Utc::now()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(state))
    }
}

// Append-only record of completed producer-to-consumer handoffs
use sqlx::Row;

use crate::error::Result;
use crate::models::TransferRecord;
use crate::storage::{from_millis, to_millis, Store};

#[derive(Clone)]
pub struct TransferLog {
    store: Store,
}

impl TransferLog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn append(&self, record: &TransferRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO transfers (producer, consumer, good, units, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&record.producer)
        .bind(&record.consumer)
        .bind(&record.good)
        .bind(record.units as i64)
        .bind(to_millis(record.created_at))
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    /// Handoffs made by one producer, oldest first.
    pub async fn for_producer(&self, producer: &str) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query(
            "SELECT producer, consumer, good, units, created_at FROM transfers WHERE producer = ?1 ORDER BY id",
        )
        .bind(producer)
        .fetch_all(self.store.pool())
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(TransferRecord {
                producer: row.try_get("producer")?,
                consumer: row.try_get("consumer")?,
                good: row.try_get("good")?,
                units: row.try_get::<i64, _>("units")? as u32,
                created_at: from_millis(row.try_get("created_at")?),
            });
        }
        Ok(records)
    }
}

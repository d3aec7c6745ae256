// Persistent survey vouchers, one live voucher per waypoint
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Survey, SurveyDeposit};
use crate::storage::{from_millis, to_millis, Store};

#[derive(Clone)]
pub struct SurveyStore {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl SurveyStore {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Store `survey` as the voucher for its waypoint, replacing any previous
    /// one. The newest survey always wins.
    pub async fn replace(&self, survey: &Survey) -> Result<()> {
        let deposits = serde_json::to_string(&survey.deposit_symbols())?;
        sqlx::query(
            "INSERT INTO surveys (waypoint, signature, expiration, deposits, size) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(waypoint) DO UPDATE SET
                signature = excluded.signature,
                expiration = excluded.expiration,
                deposits = excluded.deposits,
                size = excluded.size",
        )
        .bind(&survey.symbol)
        .bind(&survey.signature)
        .bind(to_millis(survey.expiration))
        .bind(deposits)
        .bind(&survey.size)
        .execute(self.store.pool())
        .await?;

        debug!(
            waypoint = %survey.symbol,
            signature = %survey.signature,
            "🔍 Stored survey voucher expiring {}",
            survey.expiration.format("%H:%M:%S UTC")
        );
        Ok(())
    }

    /// The live voucher for `waypoint`. An expired voucher is deleted on the
    /// way out and never returned.
    pub async fn live_for(&self, waypoint: &str) -> Result<Option<Survey>> {
        let row = sqlx::query("SELECT waypoint, signature, expiration, deposits, size FROM surveys WHERE waypoint = ?1")
            .bind(waypoint)
            .fetch_optional(self.store.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let deposits: Vec<String> = serde_json::from_str(&row.try_get::<String, _>("deposits")?)?;
        let survey = Survey {
            signature: row.try_get("signature")?,
            symbol: row.try_get("waypoint")?,
            deposits: deposits.into_iter().map(|symbol| SurveyDeposit { symbol }).collect(),
            expiration: from_millis(row.try_get("expiration")?),
            size: row.try_get("size")?,
        };

        if survey.is_live(self.clock.now()) {
            Ok(Some(survey))
        } else {
            debug!(waypoint, signature = %survey.signature, "⏰ Survey voucher expired, discarding");
            self.discard(waypoint, &survey.signature).await?;
            Ok(None)
        }
    }

    /// Drop one voucher, e.g. after the server rejected it. Only removes the
    /// row if it still carries `signature`, so a newer voucher survives.
    pub async fn discard(&self, waypoint: &str, signature: &str) -> Result<()> {
        sqlx::query("DELETE FROM surveys WHERE waypoint = ?1 AND signature = ?2")
            .bind(waypoint)
            .bind(signature)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        self.purge_before(self.clock.now()).await
    }

    async fn purge_before(&self, now: DateTime<Utc>) -> Result<u64> {
        let purged = sqlx::query("DELETE FROM surveys WHERE expiration <= ?1")
            .bind(to_millis(now))
            .execute(self.store.pool())
            .await?
            .rows_affected();
        if purged > 0 {
            debug!("🧹 Purged {} expired survey voucher(s)", purged);
        }
        Ok(purged)
    }
}

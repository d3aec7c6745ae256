// Cross-process agent leases backed by the shared store
use chrono::Duration;
use sqlx::{QueryBuilder, Sqlite};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::models::Orders;
use crate::storage::{to_millis, Store};

/// A lease held by this worker, with what is stored about the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldAgent {
    pub agent_id: String,
    pub role: String,
    pub orders: Option<Orders>,
}

/// Mutual-exclusion leases over agents, shared by every worker through the
/// store.
///
/// A lease is a row `(agent_id, role, holder, acquired_at)`. The holder is this
/// worker's id; `acquired_at` doubles as the heartbeat timestamp. A lease whose
/// heartbeat is older than the stale threshold may be taken by anyone, which is
/// how a crashed worker's agents come back into circulation.
#[derive(Clone)]
pub struct LeaseManager {
    store: Store,
    holder: String,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
}

impl LeaseManager {
    pub fn new(store: Store, holder: impl Into<String>, clock: Arc<dyn Clock>, stale_after: Duration) -> Self {
        Self {
            store,
            holder: holder.into(),
            clock,
            stale_after,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Make an agent known to the store, or update its role. Never touches the
    /// current holder.
    pub async fn register(&self, agent_id: &str, role: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO leases (agent_id, role) VALUES (?1, ?2)
             ON CONFLICT(agent_id) DO UPDATE SET role = excluded.role",
        )
        .bind(agent_id)
        .bind(role)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    /// Try to take the lease. Succeeds only when the agent is free or its
    /// lease is stale; a live lease, even one held by this worker, is refused.
    ///
    /// The check and the write are one statement, so two workers racing for
    /// the same agent can never both win.
    pub async fn acquire(&self, agent_id: &str) -> Result<bool> {
        let now = self.clock.now();
        let stale_cutoff = to_millis(now - self.stale_after);

        let result = sqlx::query(
            "INSERT INTO leases (agent_id, holder, acquired_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id) DO UPDATE
                SET holder = excluded.holder, acquired_at = excluded.acquired_at
              WHERE leases.holder IS NULL
                 OR leases.acquired_at <= ?4",
        )
        .bind(agent_id)
        .bind(&self.holder)
        .bind(to_millis(now))
        .bind(stale_cutoff)
        .execute(self.store.pool())
        .await?;

        let acquired = result.rows_affected() == 1;
        if acquired {
            debug!(agent = agent_id, holder = %self.holder, "🔒 Lease acquired");
        } else {
            debug!(agent = agent_id, holder = %self.holder, "🔒 Lease held elsewhere");
        }
        Ok(acquired)
    }

    /// Refresh the heartbeat. Returns false when the lease is no longer ours,
    /// in which case the caller must stop driving the agent.
    pub async fn heartbeat(&self, agent_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE leases SET acquired_at = ?1 WHERE agent_id = ?2 AND holder = ?3")
            .bind(to_millis(self.clock.now()))
            .bind(agent_id)
            .bind(&self.holder)
            .execute(self.store.pool())
            .await?;

        let alive = result.rows_affected() == 1;
        if !alive {
            warn!(agent = agent_id, holder = %self.holder, "💔 Lease lost");
        }
        Ok(alive)
    }

    pub async fn release(&self, agent_id: &str) -> Result<()> {
        sqlx::query("UPDATE leases SET holder = NULL, acquired_at = NULL WHERE agent_id = ?1")
            .bind(agent_id)
            .execute(self.store.pool())
            .await?;
        debug!(agent = agent_id, "🔓 Lease released");
        Ok(())
    }

    /// Clear every lease of the given roles whose heartbeat is at least
    /// `threshold_minutes` old. Returns how many were reclaimed.
    pub async fn reap_stale(&self, threshold_minutes: i64, roles: &[String]) -> Result<u64> {
        if roles.is_empty() {
            return Ok(0);
        }
        let cutoff = to_millis(self.clock.now() - Duration::minutes(threshold_minutes));

        let mut query = QueryBuilder::<Sqlite>::new(
            "UPDATE leases SET holder = NULL, acquired_at = NULL WHERE holder IS NOT NULL AND acquired_at <= ",
        );
        query.push_bind(cutoff);
        query.push(" AND role IN (");
        let mut separated = query.separated(", ");
        for role in roles {
            separated.push_bind(role.as_str());
        }
        separated.push_unseparated(")");

        let reaped = query.build().execute(self.store.pool()).await?.rows_affected();
        if reaped > 0 {
            info!("🧹 Reclaimed {} stale lease(s) older than {} minutes", reaped, threshold_minutes);
        }
        Ok(reaped)
    }

    /// Agents currently leased by this worker, optionally restricted to roles.
    pub async fn held_by_me(&self, roles: &[String]) -> Result<Vec<String>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT agent_id FROM leases WHERE holder = ");
        query.push_bind(self.holder.as_str());
        if !roles.is_empty() {
            query.push(" AND role IN (");
            let mut separated = query.separated(", ");
            for role in roles {
                separated.push_bind(role.as_str());
            }
            separated.push_unseparated(")");
        }
        query.push(" ORDER BY agent_id");

        let agents = query.build_query_scalar::<String>().fetch_all(self.store.pool()).await?;
        Ok(agents)
    }

    /// Agents leased by this worker with their role and stored orders.
    pub async fn held_with_orders(&self) -> Result<Vec<HeldAgent>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT agent_id, role, orders FROM leases WHERE holder = ?1 ORDER BY agent_id",
        )
        .bind(&self.holder)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(agent_id, role, orders)| HeldAgent {
                agent_id,
                role,
                orders: orders.as_deref().and_then(Orders::parse),
            })
            .collect())
    }

    /// Give an agent standing orders, or clear them with `None` so its role
    /// decides again. Creates the row for an agent no worker has seen yet.
    pub async fn set_orders(&self, agent_id: &str, orders: Option<Orders>) -> Result<()> {
        sqlx::query(
            "INSERT INTO leases (agent_id, orders) VALUES (?1, ?2)
             ON CONFLICT(agent_id) DO UPDATE SET orders = excluded.orders",
        )
        .bind(agent_id)
        .bind(orders.map(Orders::as_str))
        .execute(self.store.pool())
        .await?;
        info!(agent = agent_id, "📜 Orders set to {}", orders.map(Orders::as_str).unwrap_or("role default"));
        Ok(())
    }

    pub async fn orders_of(&self, agent_id: &str) -> Result<Option<Orders>> {
        let orders: Option<Option<String>> = sqlx::query_scalar("SELECT orders FROM leases WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(orders.flatten().as_deref().and_then(Orders::parse))
    }

    pub async fn holder_of(&self, agent_id: &str) -> Result<Option<String>> {
        let holder: Option<Option<String>> = sqlx::query_scalar("SELECT holder FROM leases WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(holder.flatten())
    }

    /// Registered agents of a role that nobody holds right now.
    pub async fn available(&self, role: &str) -> Result<Vec<String>> {
        let agents = sqlx::query_scalar("SELECT agent_id FROM leases WHERE role = ?1 AND holder IS NULL ORDER BY agent_id")
            .bind(role)
            .fetch_all(self.store.pool())
            .await?;
        Ok(agents)
    }
}

// Named on/off flags read by every coordination loop
use tracing::info;

use crate::error::Result;
use crate::storage::Store;

#[derive(Clone)]
pub struct DirectiveStore {
    store: Store,
}

impl DirectiveStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn set(&self, name: &str, active: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO directives (name, active) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET active = excluded.active",
        )
        .bind(name)
        .bind(active)
        .execute(self.store.pool())
        .await?;
        info!("📣 Directive {:?} is now {}", name, if active { "on" } else { "off" });
        Ok(())
    }

    /// An unknown directive reads as withdrawn.
    pub async fn is_active(&self, name: &str) -> Result<bool> {
        let active: Option<bool> = sqlx::query_scalar("SELECT active FROM directives WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(active.unwrap_or(false))
    }
}

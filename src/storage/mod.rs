// Storage module - durable coordination state shared by every worker process
pub mod directive_store;
pub mod lease_store;
pub mod survey_cache;
pub mod transfer_log;

pub use directive_store::DirectiveStore;
pub use lease_store::{HeldAgent, LeaseManager};
pub use survey_cache::SurveyStore;
pub use transfer_log::TransferLog;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS leases (
        agent_id    TEXT PRIMARY KEY,
        role        TEXT NOT NULL DEFAULT 'UNKNOWN',
        holder      TEXT,
        acquired_at INTEGER,
        orders      TEXT
    )",
    "CREATE TABLE IF NOT EXISTS edges (
        system_a TEXT NOT NULL,
        system_b TEXT NOT NULL,
        PRIMARY KEY (system_a, system_b)
    )",
    "CREATE TABLE IF NOT EXISTS surveys (
        waypoint   TEXT PRIMARY KEY,
        signature  TEXT NOT NULL,
        expiration INTEGER NOT NULL,
        deposits   TEXT NOT NULL,
        size       TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS transfers (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        producer   TEXT NOT NULL,
        consumer   TEXT NOT NULL,
        good       TEXT NOT NULL,
        units      INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS directives (
        name   TEXT PRIMARY KEY,
        active INTEGER NOT NULL
    )",
];

/// Handle on the shared SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(10));
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        debug!("💾 Coordination store ready at {}", url);
        Ok(store)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

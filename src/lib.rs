// SpaceTraders fleet coordination core
// Leases, a rate-limited gateway, jump-gate routing, survey-driven mining and
// producer/consumer cargo handoff, shared between worker processes through SQLite

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod operations;
pub mod storage;
pub mod verbosity;

use std::fs;

// Re-export commonly used types
pub use client::{Action, Gateway, RateLimiter, Transport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoordConfig;
pub use error::{CoordError, Result};
pub use models::{Agent, AgentRole, Survey, Waypoint};
pub use operations::Worker;
pub use storage::{LeaseManager, Store};

// Constants
pub const API_BASE_URL: &str = "https://api.spacetraders.io/v2";
pub const AGENT_TOKEN_FILE: &str = "AGENT_TOKEN";
pub const AGENT_TOKEN_ENV: &str = "SPACETRADERS_TOKEN";

/// Bearer token from `SPACETRADERS_TOKEN`, falling back to the `AGENT_TOKEN` file.
pub fn load_agent_token() -> Result<String> {
    if let Ok(token) = std::env::var(AGENT_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    let token = fs::read_to_string(AGENT_TOKEN_FILE)
        .map_err(|e| CoordError::Config(format!("Failed to read {}: {}", AGENT_TOKEN_FILE, e)))?
        .trim()
        .to_string();
    if token.is_empty() {
        return Err(CoordError::Config(format!("{} is empty", AGENT_TOKEN_FILE)));
    }
    Ok(token)
}

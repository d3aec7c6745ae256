use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{CoordError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordConfig {
    pub api: ApiConfig,
    pub leases: LeaseConfig,
    pub mining: MiningConfig,
    pub transfer: TransferConfig,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Minimum milliseconds between any two outbound calls from this process
    pub min_interval_ms: u64,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_seconds: u64,
    /// Delay used when a 429 carries no retry hint
    pub fallback_retry_seconds: f64,
    /// Page size requested for paginated reads
    pub page_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Heartbeat age after which a lease is reclaimable
    pub stale_threshold_minutes: i64,
    /// Roles swept by the stale-lease reaper at the start of each cycle
    pub reap_roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Waypoint miners and haulers gather at
    pub mining_waypoint: String,
    /// Market where haulers sell when no contract delivery applies
    pub market_waypoint: String,
    /// Good a survey should preferably contain
    pub wanted_good: Option<String>,
    /// Consecutive zero-gain extractions before giving up
    pub stuck_after_attempts: u32,
    /// Roles that mine unless given other orders
    pub producer_roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// How many times a producer polls for a consumer before giving up
    pub poll_attempts: u32,
    /// Seconds between consumer polls
    pub poll_delay_seconds: u64,
    /// Upper bound on units moved by a single transfer call
    pub max_units_per_call: u32,
    /// Hauler polls for incoming cargo before selling what it has
    pub hauler_wait_polls: u32,
    /// Roles that haul unless given other orders
    pub consumer_roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay between coordination cycles in seconds
    pub cycle_delay_seconds: u64,
    /// Directive checked by every coordination loop
    pub directive: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sqlx connection string for the shared coordination database
    pub database_url: String,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: crate::API_BASE_URL.to_string(),
                min_interval_ms: 1000, // 1 request/second, shared process-wide
                request_timeout_seconds: 30,
                fallback_retry_seconds: 120.0,
                page_limit: 20,
            },
            leases: LeaseConfig {
                stale_threshold_minutes: 20,
                reap_roles: vec![
                    "COMMAND".to_string(),
                    "EXCAVATOR".to_string(),
                    "HAULER".to_string(),
                    "SATELLITE".to_string(),
                    "SURVEYOR".to_string(),
                ],
            },
            mining: MiningConfig {
                mining_waypoint: String::new(),
                market_waypoint: String::new(),
                wanted_good: None,
                stuck_after_attempts: 5,
                producer_roles: vec![
                    "COMMAND".to_string(),
                    "EXCAVATOR".to_string(),
                    "SURVEYOR".to_string(),
                ],
            },
            transfer: TransferConfig {
                poll_attempts: 5,
                poll_delay_seconds: 30,
                max_units_per_call: 40,
                hauler_wait_polls: 20,
                consumer_roles: vec!["HAULER".to_string()],
            },
            timing: TimingConfig {
                cycle_delay_seconds: 10,
                directive: "mine".to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://coordination.db".to_string(),
            },
        }
    }
}

impl CoordConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create(config_path: &str) -> Result<Self> {
        if Path::new(config_path).exists() {
            info!("📋 Loading configuration from {}", config_path);
            let config_str = fs::read_to_string(config_path)?;
            toml::from_str(&config_str).map_err(|e| CoordError::Config(e.to_string()))
        } else {
            info!("📋 Creating default configuration at {}", config_path);
            let config = CoordConfig::default();
            config.save(config_path)?;
            info!("💡 Edit {} to set the mining and market waypoints", config_path);
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self, config_path: &str) -> Result<()> {
        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let config_str =
            toml::to_string_pretty(self).map_err(|e| CoordError::Config(e.to_string()))?;
        fs::write(config_path, config_str)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(CoordError::Config("api.base_url must be set".to_string()));
        }
        if self.api.page_limit == 0 {
            return Err(CoordError::Config("api.page_limit must be greater than 0".to_string()));
        }
        if self.leases.stale_threshold_minutes <= 0 {
            return Err(CoordError::Config(
                "leases.stale_threshold_minutes must be positive".to_string(),
            ));
        }
        if self.mining.stuck_after_attempts == 0 {
            return Err(CoordError::Config(
                "mining.stuck_after_attempts must be greater than 0".to_string(),
            ));
        }
        if self.transfer.max_units_per_call == 0 {
            return Err(CoordError::Config(
                "transfer.max_units_per_call must be greater than 0".to_string(),
            ));
        }
        if self.timing.cycle_delay_seconds == 0 {
            return Err(CoordError::Config(
                "timing.cycle_delay_seconds must be greater than 0".to_string(),
            ));
        }

        info!("✅ Configuration validation passed");
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.api.min_interval_ms)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("   🌐 API: {} ({}ms between calls)", self.api.base_url, self.api.min_interval_ms);
        info!("   🔒 Stale lease threshold: {} minutes", self.leases.stale_threshold_minutes);
        info!("   ⛏️  Mining at {:?}, selling at {:?}", self.mining.mining_waypoint, self.mining.market_waypoint);
        info!(
            "   📦 Consumer wait: {} polls x {}s",
            self.transfer.poll_attempts, self.transfer.poll_delay_seconds
        );
        info!("   ⏰ Cycle delay: {}s, directive {:?}", self.timing.cycle_delay_seconds, self.timing.directive);
    }
}

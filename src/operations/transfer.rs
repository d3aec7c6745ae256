// Producer -> consumer cargo handoff
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::Gateway;
use crate::error::{CoordError, Result};
use crate::models::{Agent, NavStatus, Orders, TransferRecord};
use crate::storage::{LeaseManager, TransferLog};

/// Result of offering a producer's cargo to the consumers at its waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// Some consumer was found. `remaining` is what the producer still holds
    /// of the good.
    Moved { moved: u32, remaining: u32 },
    /// Nobody showed up within the polling window.
    NoConsumer,
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Roles that mine when no orders are stored
    pub producer_roles: Vec<String>,
    /// Roles that haul when no orders are stored
    pub consumer_roles: Vec<String>,
    pub poll_attempts: u32,
    pub poll_delay: Duration,
    pub max_units_per_call: u32,
}

/// Matches producers with consumers leased by this worker and moves cargo
/// between them.
///
/// Every transfer into a consumer runs under that consumer's lock and starts
/// from a fresh read of its hold, so concurrent producers never overfill it.
#[derive(Clone)]
pub struct TransferCoordinator {
    gateway: Gateway,
    leases: LeaseManager,
    log: TransferLog,
    settings: TransferSettings,
    consumer_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TransferCoordinator {
    pub fn new(gateway: Gateway, leases: LeaseManager, log: TransferLog, settings: TransferSettings) -> Self {
        Self {
            gateway,
            leases,
            log,
            settings,
            consumer_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn log(&self) -> &TransferLog {
        &self.log
    }

    /// Agents held by this worker under haul orders that sit at `waypoint`,
    /// landed, with room to spare. Each is re-read from the server; most
    /// spare capacity first.
    pub async fn match_consumers(&self, good: &str, waypoint: &str) -> Result<Vec<Agent>> {
        let held = self.leases.held_with_orders().await?;

        let mut consumers = Vec::new();
        for candidate in held {
            let orders = Orders::resolve(
                candidate.orders,
                &candidate.role,
                &self.settings.producer_roles,
                &self.settings.consumer_roles,
            );
            if orders != Orders::Haul {
                continue;
            }
            let consumer = self.gateway.load_agent(&candidate.agent_id).await?;
            if consumer.location.waypoint == waypoint
                && consumer.nav_status != NavStatus::InTransit
                && consumer.spare_capacity() > 0
            {
                consumers.push(consumer);
            }
        }
        consumers.sort_by(|a, b| b.spare_capacity().cmp(&a.spare_capacity()).then_with(|| a.symbol.cmp(&b.symbol)));

        debug!("📦 {} consumer(s) for {} at {}", consumers.len(), good, waypoint);
        Ok(consumers)
    }

    async fn consumer_lock(&self, consumer: &str) -> Arc<Mutex<()>> {
        let mut locks = self.consumer_locks.lock().await;
        locks.entry(consumer.to_string()).or_default().clone()
    }

    /// Move up to `units` of `good` from `producer` to `consumer`. The amount
    /// is capped by what the producer holds and what the consumer can take.
    /// Returns the units actually moved.
    pub async fn transfer(&self, producer: &mut Agent, consumer: &mut Agent, good: &str, units: u32) -> Result<u32> {
        let lock = self.consumer_lock(&consumer.symbol).await;
        let _reserved = lock.lock().await;

        // the consumer may have been released or reaped since it was matched
        if self.leases.holder_of(&consumer.symbol).await?.as_deref() != Some(self.leases.holder()) {
            return Err(CoordError::LeaseUnavailable(consumer.symbol.clone()));
        }

        self.gateway.refresh(consumer).await?;
        let planned = units.min(producer.units_of(good)).min(consumer.spare_capacity());
        if planned == 0 {
            return Ok(0);
        }

        let outcome = self.send_in_chunks(producer, consumer, good, planned).await;
        let moved = match &outcome {
            Ok(moved) => *moved,
            Err((moved, _)) => *moved,
        };
        if moved > 0 {
            self.log
                .append(&TransferRecord {
                    producer: producer.symbol.clone(),
                    consumer: consumer.symbol.clone(),
                    good: good.to_string(),
                    units: moved,
                    created_at: self.gateway.clock().now(),
                })
                .await?;
            info!("🤝 {} -> {}: {} x{}", producer.symbol, consumer.symbol, good, moved);
        }

        outcome.map_err(|(_, e)| e)
    }

    async fn send_in_chunks(
        &self,
        producer: &mut Agent,
        consumer: &mut Agent,
        good: &str,
        planned: u32,
    ) -> std::result::Result<u32, (u32, CoordError)> {
        let mut moved = 0;
        while moved < planned {
            let chunk = (planned - moved).min(self.settings.max_units_per_call.max(1));
            match self.gateway.transfer(producer, good, chunk, &consumer.symbol).await {
                Ok(data) => {
                    match &data.target_cargo {
                        Some(cargo) => consumer.apply_cargo(cargo),
                        None => consumer.add_units(good, chunk),
                    }
                    moved += chunk;
                }
                Err(e) => {
                    warn!("📦 Transfer {} -> {} failed after {} units: {}", producer.symbol, consumer.symbol, moved, e);
                    return Err((moved, e));
                }
            }
        }
        Ok(moved)
    }

    /// Offer everything the producer holds of `good` to consumers at its
    /// waypoint, polling for one to arrive. The caller decides what to do
    /// with whatever is left.
    pub async fn handoff(&self, producer: &mut Agent, good: &str) -> Result<HandoffOutcome> {
        let attempts = self.settings.poll_attempts.max(1);

        for attempt in 1..=attempts {
            let consumers = self.match_consumers(good, &producer.location.waypoint).await?;
            if consumers.is_empty() {
                if attempt < attempts {
                    debug!(ship = %producer.symbol, "⏳ No consumer yet ({}/{})", attempt, attempts);
                    sleep(self.settings.poll_delay).await;
                }
                continue;
            }

            let moved = self.fill_consumers(producer, good, consumers).await?;
            return Ok(HandoffOutcome::Moved { moved, remaining: producer.units_of(good) });
        }

        Ok(HandoffOutcome::NoConsumer)
    }

    /// Offer the producer's `good` to each consumer in turn until it runs
    /// out. Consumers released since they were matched are skipped.
    pub async fn fill_consumers(&self, producer: &mut Agent, good: &str, consumers: Vec<Agent>) -> Result<u32> {
        let mut moved = 0;
        for mut consumer in consumers {
            let offered = producer.units_of(good);
            if offered == 0 {
                break;
            }
            match self.transfer(producer, &mut consumer, good, offered).await {
                Ok(units) => moved += units,
                Err(CoordError::LeaseUnavailable(symbol)) => {
                    warn!(ship = %producer.symbol, "📦 {} is no longer ours, trying the next consumer", symbol);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(moved)
    }
}

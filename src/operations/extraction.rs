// Survey and extraction scheduling for producer agents
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::Gateway;
use crate::error::{CoordError, Result};
use crate::models::{Agent, NavStatus, Survey};
use crate::operations::keep_alive::KeepAlive;
use crate::storage::SurveyStore;

/// API codes for a survey voucher the server no longer honours
const SURVEY_EXPIRED_CODE: i64 = 4221;
const SURVEY_EXHAUSTED_CODE: i64 = 4224;

#[derive(Clone)]
pub struct ExtractionScheduler {
    gateway: Gateway,
    surveys: SurveyStore,
    stuck_after: u32,
    keep_alive: Option<KeepAlive>,
}

impl ExtractionScheduler {
    pub fn new(gateway: Gateway, surveys: SurveyStore, stuck_after: u32) -> Self {
        Self { gateway, surveys, stuck_after: stuck_after.max(1), keep_alive: None }
    }

    /// Heartbeat and re-check the directive before every extraction.
    pub fn with_keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn surveys(&self) -> &SurveyStore {
        &self.surveys
    }

    async fn wait_for_cooldown(&self, agent: &Agent) {
        let remaining = agent.cooldown_remaining(self.gateway.clock().now());
        if !remaining.is_zero() {
            debug!(ship = %agent.symbol, "⏳ Waiting {:?} for cooldown", remaining);
            sleep(remaining).await;
        }
    }

    async fn ensure_orbit(&self, agent: &mut Agent) -> Result<()> {
        self.gateway.wait_for_arrival(agent).await?;
        if agent.nav_status != NavStatus::InOrbit {
            self.gateway.orbit(agent).await?;
        }
        Ok(())
    }

    /// Survey the agent's waypoint and keep the best result as that
    /// waypoint's voucher: the first survey holding `wanted_good`, or the
    /// first survey when nothing matches.
    pub async fn request_survey(&self, agent: &mut Agent, wanted_good: Option<&str>) -> Result<Survey> {
        self.wait_for_cooldown(agent).await;
        self.ensure_orbit(agent).await?;

        let data = self.gateway.survey(agent).await?;
        let chosen = wanted_good
            .and_then(|good| data.surveys.iter().find(|s| s.contains(good)))
            .or_else(|| data.surveys.first())
            .cloned()
            .ok_or_else(|| CoordError::UnexpectedResponse("survey returned no results".to_string()))?;

        self.surveys.replace(&chosen).await?;
        info!(
            ship = %agent.symbol,
            "🔍 Surveyed {}: {} [{}]",
            chosen.symbol,
            chosen.signature,
            chosen.deposit_symbols().join(", ")
        );
        Ok(chosen)
    }

    /// One extraction at the agent's waypoint, using the live voucher when
    /// there is one. Returns the units actually added to the hold.
    pub async fn extract(&self, agent: &mut Agent) -> Result<u32> {
        self.wait_for_cooldown(agent).await;
        self.ensure_orbit(agent).await?;

        let before = agent.cargo.units;
        let voucher = self.surveys.live_for(&agent.location.waypoint).await?;

        let result = self.gateway.extract(agent, voucher.as_ref()).await;
        let data = match (result, voucher) {
            (Err(CoordError::ActionFailed { code, message }), Some(voucher))
                if code == SURVEY_EXPIRED_CODE || code == SURVEY_EXHAUSTED_CODE =>
            {
                warn!(ship = %agent.symbol, "🔍 Voucher {} rejected ({}): {}", voucher.signature, code, message);
                self.surveys.discard(&voucher.symbol, &voucher.signature).await?;
                self.gateway.extract(agent, None).await?
            }
            (result, _) => result?,
        };

        let gained = agent.cargo.units.saturating_sub(before);
        debug!(
            ship = %agent.symbol,
            "⛏️ Extracted {} x{} ({}/{})",
            data.extraction.extraction_yield.symbol,
            gained,
            agent.cargo.units,
            agent.cargo.capacity
        );
        Ok(gained)
    }

    /// Extract until the hold is full. Gives up with `StuckExtracting` after
    /// `stuck_after` consecutive extractions that added nothing, and with
    /// `Interrupted` as soon as the keep-alive says stop.
    pub async fn extract_until_full(&self, agent: &mut Agent) -> Result<u32> {
        let mut total = 0;
        let mut barren = 0;

        while !agent.is_full() {
            if let Some(keep_alive) = &self.keep_alive {
                keep_alive.ensure(&agent.symbol).await?;
            }
            let gained = self.extract(agent).await?;
            if gained == 0 {
                barren += 1;
                if barren >= self.stuck_after {
                    return Err(CoordError::StuckExtracting { ship: agent.symbol.clone(), attempts: barren });
                }
            } else {
                barren = 0;
                total += gained;
            }
        }

        info!(ship = %agent.symbol, "📦 Hold full: {} units mined this run", total);
        Ok(total)
    }

    /// Dock and sell every cargo line. Returns the credits earned.
    pub async fn sell_all(&self, agent: &mut Agent) -> Result<i64> {
        if agent.nav_status != NavStatus::Docked {
            self.gateway.dock(agent).await?;
        }

        let lines: Vec<(String, u32)> =
            agent.inventory().iter().map(|item| (item.symbol.clone(), item.units)).collect();
        let mut earned = 0;
        for (good, units) in lines {
            let trade = self.gateway.sell(agent, &good, units).await?;
            info!(
                ship = %agent.symbol,
                "💰 Sold {} x{} for {}",
                good,
                trade.transaction.units,
                trade.transaction.total_price
            );
            earned += trade.transaction.total_price;
        }
        Ok(earned)
    }
}

// Coordination cycle: lease agents and drive each one on its own task
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::client::Gateway;
use crate::clock::Clock;
use crate::config::CoordConfig;
use crate::error::{CoordError, Result};
use crate::models::{Agent, Orders};
use crate::operations::extraction::ExtractionScheduler;
use crate::operations::keep_alive::KeepAlive;
use crate::operations::routing::Router;
use crate::operations::task_state::{AgentTask, TaskState};
use crate::operations::topology::TopologyGraph;
use crate::operations::transfer::{HandoffOutcome, TransferCoordinator, TransferSettings};
use crate::storage::{DirectiveStore, LeaseManager, Store, SurveyStore, TransferLog};

/// Shortest pause between two idle hauler rounds
const IDLE_HAULER_PAUSE: Duration = Duration::from_secs(1);

/// What one coordination cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub reaped: u64,
    pub started: usize,
    pub directive_active: bool,
}

/// One worker process. Everything it shares with other workers lives in the
/// store; everything else is local to this process.
#[derive(Clone)]
pub struct Worker {
    config: Arc<CoordConfig>,
    gateway: Gateway,
    leases: LeaseManager,
    directives: DirectiveStore,
    keep_alive: KeepAlive,
    router: Router,
    scheduler: ExtractionScheduler,
    transfers: TransferCoordinator,
}

/// Agents currently driven by this worker, keyed by task id.
#[derive(Default)]
pub struct AgentTasks {
    set: JoinSet<String>,
    running: HashMap<Id, String>,
}

impl AgentTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, agent: &str) -> bool {
        self.running.values().any(|a| a == agent)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    fn settle(&mut self, finished: std::result::Result<(Id, String), JoinError>) {
        match finished {
            Ok((id, _)) => {
                self.running.remove(&id);
            }
            Err(e) => {
                let agent = self.running.remove(&e.id()).unwrap_or_default();
                error!(ship = %agent, "💥 Agent task aborted: {}", e);
            }
        }
    }

    /// Forget tasks that have already finished.
    pub fn reap_finished(&mut self) {
        while let Some(finished) = self.set.try_join_next_with_id() {
            self.settle(finished);
        }
    }

    /// Wait for every task to finish.
    pub async fn drain(&mut self) {
        while let Some(finished) = self.set.join_next_with_id().await {
            self.settle(finished);
        }
    }
}

impl Worker {
    pub fn new(config: CoordConfig, gateway: Gateway, store: Store, holder: &str, clock: Arc<dyn Clock>) -> Self {
        let leases = LeaseManager::new(
            store.clone(),
            holder,
            clock.clone(),
            chrono::Duration::minutes(config.leases.stale_threshold_minutes),
        );
        let directives = DirectiveStore::new(store.clone());
        let keep_alive = KeepAlive::new(leases.clone(), directives.clone(), config.timing.directive.clone());
        let router =
            Router::new(gateway.clone(), TopologyGraph::new(store.clone())).with_keep_alive(keep_alive.clone());
        let scheduler = ExtractionScheduler::new(
            gateway.clone(),
            SurveyStore::new(store.clone(), clock),
            config.mining.stuck_after_attempts,
        )
        .with_keep_alive(keep_alive.clone());
        let transfers = TransferCoordinator::new(
            gateway.clone(),
            leases.clone(),
            TransferLog::new(store),
            TransferSettings {
                producer_roles: config.mining.producer_roles.clone(),
                consumer_roles: config.transfer.consumer_roles.clone(),
                poll_attempts: config.transfer.poll_attempts,
                poll_delay: Duration::from_secs(config.transfer.poll_delay_seconds),
                max_units_per_call: config.transfer.max_units_per_call,
            },
        );

        Self {
            config: Arc::new(config),
            gateway,
            leases,
            directives,
            keep_alive,
            router,
            scheduler,
            transfers,
        }
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    pub fn directives(&self) -> &DirectiveStore {
        &self.directives
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn transfers(&self) -> &TransferCoordinator {
        &self.transfers
    }

    /// Run coordination cycles until the directive is withdrawn, then wait
    /// for every agent task to wind down.
    pub async fn run(&self) -> Result<()> {
        if self.config.mining.mining_waypoint.is_empty() || self.config.mining.market_waypoint.is_empty() {
            return Err(CoordError::Config(
                "mining.mining_waypoint and mining.market_waypoint must be set".to_string(),
            ));
        }

        let mut tasks = AgentTasks::new();
        loop {
            tasks.reap_finished();
            let report = self.cycle(&mut tasks).await?;
            if !report.directive_active {
                info!("🛑 Directive {:?} withdrawn, winding down", self.config.timing.directive);
                break;
            }
            sleep(Duration::from_secs(self.config.timing.cycle_delay_seconds)).await;
        }

        tasks.drain().await;
        info!("✅ All agent tasks finished");
        Ok(())
    }

    /// Orders an agent runs under: stored orders, else its role's default.
    pub async fn orders_for(&self, symbol: &str, role: &str) -> Result<Orders> {
        let stored = self.leases.orders_of(symbol).await?;
        Ok(Orders::resolve(
            stored,
            role,
            &self.config.mining.producer_roles,
            &self.config.transfer.consumer_roles,
        ))
    }

    /// Reclaim stale leases, then, if the directive is active, lease every
    /// free agent with mine or haul orders and start a task for it.
    pub async fn cycle(&self, tasks: &mut AgentTasks) -> Result<CycleReport> {
        let mut report = CycleReport {
            reaped: self
                .leases
                .reap_stale(self.config.leases.stale_threshold_minutes, &self.config.leases.reap_roles)
                .await?,
            ..CycleReport::default()
        };

        report.directive_active = self.directives.is_active(&self.config.timing.directive).await?;
        if !report.directive_active {
            return Ok(report);
        }

        let now = self.gateway.clock().now();
        for ship in self.gateway.ships().await? {
            let agent = Agent::from_ship(&ship, now);
            if tasks.is_running(&agent.symbol)
                || self.orders_for(&agent.symbol, agent.role.as_str()).await? == Orders::Idle
            {
                continue;
            }

            self.leases.register(&agent.symbol, agent.role.as_str()).await?;
            if !self.leases.acquire(&agent.symbol).await? {
                continue;
            }

            let symbol = agent.symbol.clone();
            let worker = self.clone();
            let handle = tasks.set.spawn(async move { worker.drive(agent).await });
            tasks.running.insert(handle.id(), symbol);
            report.started += 1;
        }

        if report.started > 0 {
            info!("🚦 Started {} agent task(s), {} running", report.started, tasks.len());
        }
        Ok(report)
    }

    /// Drive one leased agent until the directive is withdrawn, the lease is
    /// lost or something fails. A lease still held is released at the end.
    pub async fn drive(&self, mut agent: Agent) -> String {
        let mut task = AgentTask::new(agent.symbol.clone());
        let outcome = match task.advance(TaskState::Leased) {
            Ok(()) => self.drive_rounds(&mut agent, &mut task).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(CoordError::Interrupted(_)) => {
                info!(ship = %agent.symbol, state = %task.state(), "🛑 Stopped between actions");
            }
            Err(e) => {
                error!(ship = %agent.symbol, state = %task.state(), "❌ Agent task failed: {}", e);
                task.fault();
            }
        }
        if let Err(e) = self.release_if_mine(&agent.symbol).await {
            error!(ship = %agent.symbol, "❌ Could not release lease: {}", e);
        }
        if let Err(e) = task.release() {
            warn!(ship = %agent.symbol, "⚠️ {}", e);
        }
        agent.symbol
    }

    /// A lease taken over by another worker is left alone.
    async fn release_if_mine(&self, agent: &str) -> Result<()> {
        if self.leases.holder_of(agent).await?.as_deref() == Some(self.leases.holder()) {
            self.leases.release(agent).await?;
        }
        Ok(())
    }

    async fn drive_rounds(&self, agent: &mut Agent, task: &mut AgentTask) -> Result<()> {
        while self.keep_going(&agent.symbol).await? {
            // orders may change between rounds
            match self.orders_for(&agent.symbol, agent.role.as_str()).await? {
                Orders::Mine => self.mining_round(agent, task).await?,
                Orders::Haul => self.hauling_round(agent, task).await?,
                Orders::Idle => {
                    info!(ship = %agent.symbol, "💤 Orders say idle, letting go");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn keep_going(&self, agent: &str) -> Result<bool> {
        self.keep_alive.check(agent).await
    }

    /// Go to the field, survey if able, fill the hold, then hand the cargo to
    /// consumers or sell it.
    pub async fn mining_round(&self, agent: &mut Agent, task: &mut AgentTask) -> Result<()> {
        let field = &self.config.mining.mining_waypoint;

        task.advance(TaskState::Navigating)?;
        self.router.navigate(agent, field).await?;
        self.router.ensure_orbit(agent).await?;
        task.advance(TaskState::Orbiting)?;

        if agent.can_survey && self.scheduler.surveys().live_for(field).await?.is_none() {
            task.advance(TaskState::Surveying)?;
            self.scheduler
                .request_survey(agent, self.config.mining.wanted_good.as_deref())
                .await?;
        }

        task.advance(TaskState::Extracting)?;
        self.scheduler.extract_until_full(agent).await?;

        if !self.keep_going(&agent.symbol).await? {
            return Ok(());
        }

        task.advance(TaskState::Transferring)?;
        let goods: Vec<String> = agent.inventory().iter().map(|item| item.symbol.clone()).collect();
        for good in goods {
            match self.transfers.handoff(agent, &good).await? {
                HandoffOutcome::Moved { moved, remaining } => {
                    info!(ship = %agent.symbol, "📦 Handed off {} x{}, {} left", good, moved, remaining);
                }
                HandoffOutcome::NoConsumer => {
                    info!(ship = %agent.symbol, "📦 No consumer for {}", good);
                }
            }
        }

        if agent.cargo.units > 0 {
            self.sell_at_market(agent, task).await?;
        }
        Ok(())
    }

    /// Wait at the field for producers to fill the hold, then sell.
    pub async fn hauling_round(&self, agent: &mut Agent, task: &mut AgentTask) -> Result<()> {
        task.advance(TaskState::Navigating)?;
        self.router.navigate(agent, &self.config.mining.mining_waypoint).await?;
        self.router.ensure_orbit(agent).await?;
        task.advance(TaskState::Orbiting)?;

        let poll_delay = Duration::from_secs(self.config.transfer.poll_delay_seconds);
        for _ in 0..self.config.transfer.hauler_wait_polls {
            if agent.is_full() || !self.keep_going(&agent.symbol).await? {
                break;
            }
            sleep(poll_delay).await;
            self.gateway.refresh(agent).await?;
        }

        if agent.cargo.units > 0 {
            self.sell_at_market(agent, task).await?;
        } else {
            sleep(poll_delay.max(IDLE_HAULER_PAUSE)).await;
        }
        Ok(())
    }

    async fn sell_at_market(&self, agent: &mut Agent, task: &mut AgentTask) -> Result<()> {
        task.advance(TaskState::Navigating)?;
        self.router.navigate(agent, &self.config.mining.market_waypoint).await?;
        task.advance(TaskState::Docked)?;
        task.advance(TaskState::Selling)?;
        let earned = self.scheduler.sell_all(agent).await?;
        info!(ship = %agent.symbol, "💰 Earned {} credits", earned);
        Ok(())
    }
}

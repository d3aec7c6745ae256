// Multi-hop routing across systems and travel within a system
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::Gateway;
use crate::error::{CoordError, Result};
use crate::models::{system_of, Agent, NavStatus};
use crate::operations::keep_alive::KeepAlive;
use crate::operations::topology::TopologyGraph;

/// Extra wait after a reported arrival or cooldown before the next call
const ARRIVAL_MARGIN: Duration = Duration::from_secs(1);

/// Moves agents between waypoints, jumping through gates when the target is
/// in another system. Learns the gate graph as it goes.
#[derive(Clone)]
pub struct Router {
    gateway: Gateway,
    graph: TopologyGraph,
    gates: Arc<Mutex<HashMap<String, String>>>,
    keep_alive: Option<KeepAlive>,
}

impl Router {
    pub fn new(gateway: Gateway, graph: TopologyGraph) -> Self {
        Self {
            gateway,
            graph,
            gates: Arc::new(Mutex::new(HashMap::new())),
            keep_alive: None,
        }
    }

    /// Heartbeat and re-check the directive before every leg of a trip.
    pub fn with_keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    async fn still_wanted(&self, agent: &Agent) -> Result<()> {
        match &self.keep_alive {
            Some(keep_alive) => keep_alive.ensure(&agent.symbol).await,
            None => Ok(()),
        }
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Jump gate waypoint of `system`, looked up once and remembered.
    pub async fn jump_gate_of(&self, system: &str) -> Result<String> {
        if let Some(gate) = self.gates.lock().ok().and_then(|gates| gates.get(system).cloned()) {
            return Ok(gate);
        }

        let waypoints = self.gateway.waypoints(system).await?;
        let gate = waypoints
            .iter()
            .find(|w| w.is_jump_gate())
            .map(|w| w.symbol.clone())
            .ok_or_else(|| CoordError::UnexpectedResponse(format!("system {} has no jump gate", system)))?;

        if let Ok(mut gates) = self.gates.lock() {
            gates.insert(system.to_string(), gate.clone());
        }
        Ok(gate)
    }

    /// Read the gate of `system` and record an edge for each of its
    /// connections. Returns the connected systems.
    pub async fn discover(&self, system: &str) -> Result<Vec<String>> {
        let gate = self.jump_gate_of(system).await?;
        let neighbours = self.gateway.jump_gate(system, &gate).await?.neighbour_systems();

        let mut added = 0;
        for neighbour in &neighbours {
            if self.graph.record_edge(system, neighbour).await? {
                added += 1;
            }
        }
        info!("🛰️ Discovered {}: {} connection(s), {} new", system, neighbours.len(), added);
        Ok(neighbours)
    }

    /// Breadth-first discovery from `start`, at most `depth_limit` jumps out.
    /// Each system is read once. Systems without a readable gate are skipped.
    pub async fn explore(&self, start: &str, depth_limit: u32) -> Result<Vec<String>> {
        let mut visited: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
        let mut queue: VecDeque<(String, u32)> = VecDeque::from([(start.to_string(), 0)]);

        while let Some((system, depth)) = queue.pop_front() {
            let neighbours = match self.discover(&system).await {
                Ok(neighbours) => neighbours,
                Err(e @ CoordError::UnexpectedResponse(_)) => {
                    warn!("⚠️ Skipping {}: {}", system, e);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            visited.push(system);

            if depth >= depth_limit {
                continue;
            }
            for neighbour in neighbours {
                if seen.insert(neighbour.clone()) {
                    queue.push_back((neighbour, depth + 1));
                }
            }
        }

        info!("🗺️ Explored {} system(s) from {} (depth {})", visited.len(), start, depth_limit);
        Ok(visited)
    }

    async fn plan(&self, from: &str, to: &str) -> Result<Vec<String>> {
        match self.graph.shortest_path(from, to).await {
            Err(CoordError::NoPathFound { .. }) => {
                debug!("🗺️ No known path {} -> {}, discovering {}", from, to, from);
                self.discover(from).await?;
                self.graph.shortest_path(from, to).await
            }
            other => other,
        }
    }

    /// Take `agent` to `target`. Already being there is a no-op.
    ///
    /// Cross-system trips fly to the local gate and jump hop by hop. On
    /// arrival the agent docks, and refuels unless it stands at a jump gate.
    pub async fn navigate(&self, agent: &mut Agent, target: &str) -> Result<()> {
        if agent.location.waypoint == target {
            return Ok(());
        }

        let target_system = system_of(target);
        if agent.location.system != target_system {
            let path = self.plan(&agent.location.system, &target_system).await?;
            info!(ship = %agent.symbol, "🧭 Route {}", path.join(" -> "));

            let gate = self.jump_gate_of(&agent.location.system).await?;
            self.still_wanted(agent).await?;
            self.travel(agent, &gate).await?;

            for hop in path.iter().skip(1) {
                self.still_wanted(agent).await?;
                self.ensure_orbit(agent).await?;
                let jump = self.gateway.jump(agent, hop).await?;
                debug!(ship = %agent.symbol, "🌀 Jumped to {}", hop);
                sleep(Duration::from_secs(jump.cooldown.remaining_seconds) + ARRIVAL_MARGIN).await;
            }
        }

        if agent.location.waypoint != target {
            self.still_wanted(agent).await?;
            self.travel(agent, target).await?;
        }

        self.gateway.wait_for_arrival(agent).await?;
        if agent.nav_status != NavStatus::Docked {
            self.gateway.dock(agent).await?;
        }

        let at_gate = match self.jump_gate_of(&target_system).await {
            Ok(gate) => gate == target,
            Err(e) => {
                warn!(ship = %agent.symbol, "⚠️ No gate known for {}: {}", target_system, e);
                false
            }
        };
        if !at_gate {
            if let Err(e) = self.gateway.refuel(agent).await {
                warn!(ship = %agent.symbol, "⛽ Refuel at {} failed: {}", target, e);
            }
        }
        Ok(())
    }

    /// In-system flight to `waypoint`, waiting out the travel time.
    async fn travel(&self, agent: &mut Agent, waypoint: &str) -> Result<()> {
        if agent.location.waypoint == waypoint {
            return Ok(());
        }
        self.ensure_orbit(agent).await?;
        let data = self.gateway.navigate(agent, waypoint).await?;
        let travel = data.nav.route.as_ref().map(|r| r.travel_seconds()).unwrap_or(0);
        info!(ship = %agent.symbol, "🚀 Flying to {} ({}s)", waypoint, travel);
        sleep(Duration::from_secs(travel) + ARRIVAL_MARGIN).await;
        agent.nav_status = NavStatus::InOrbit;
        Ok(())
    }

    /// Put the agent in orbit, first waiting out any flight in progress.
    pub async fn ensure_orbit(&self, agent: &mut Agent) -> Result<()> {
        self.gateway.wait_for_arrival(agent).await?;
        if agent.nav_status != NavStatus::InOrbit {
            self.gateway.orbit(agent).await?;
        }
        Ok(())
    }
}

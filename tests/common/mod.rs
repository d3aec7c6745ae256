// In-memory SpaceTraders world behind the Transport trait
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spacetraders_coord::client::{ApiRequest, ApiResponse, Method, Transport};
use spacetraders_coord::models::*;
use spacetraders_coord::{Gateway, RateLimiter, Result, SystemClock};

pub struct WorldState {
    pub ships: HashMap<String, Ship>,
    /// Units added per extraction, per ship (default 10)
    pub yields: HashMap<String, u32>,
    pub yield_good: String,
    /// Returned by the next survey call
    pub survey_results: Vec<Survey>,
    /// Signatures the server refuses with code 4224
    pub exhausted_signatures: HashSet<String>,
    /// Signature passed with every extraction, in order
    pub extract_vouchers: Vec<Option<String>>,
    pub waypoints: HashMap<String, Vec<Waypoint>>,
    /// system -> connected systems, as reported by its jump gate
    pub gates: HashMap<String, Vec<String>>,
    /// Echo `targetCargo` on transfers
    pub echo_target_cargo: bool,
    /// Responses served before any simulated behaviour
    pub queued: VecDeque<ApiResponse>,
    pub requests: Vec<ApiRequest>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            ships: HashMap::new(),
            yields: HashMap::new(),
            yield_good: "IRON_ORE".to_string(),
            survey_results: Vec::new(),
            exhausted_signatures: HashSet::new(),
            extract_vouchers: Vec::new(),
            waypoints: HashMap::new(),
            gates: HashMap::new(),
            echo_target_cargo: true,
            queued: VecDeque::new(),
            requests: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeWorld {
    pub state: Mutex<WorldState>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut WorldState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_ship(&self, ship: Ship) {
        self.with(|s| s.ships.insert(ship.symbol.clone(), ship));
    }

    pub fn ship(&self, symbol: &str) -> Ship {
        self.with(|s| s.ships[symbol].clone())
    }

    pub fn add_system(&self, system: &str, connections: &[&str]) {
        let gate = gate_of(system);
        self.with(|s| {
            s.waypoints.insert(
                system.to_string(),
                vec![
                    waypoint(&gate, "JUMP_GATE", &[]),
                    waypoint(&format!("{}-FIELD", system), "ASTEROID_FIELD", &[]),
                    waypoint(&format!("{}-MARKET", system), "PLANET", &["MARKETPLACE"]),
                ],
            );
            s.gates.insert(system.to_string(), connections.iter().map(|c| c.to_string()).collect());
        });
    }

    pub fn queue(&self, response: ApiResponse) {
        self.with(|s| s.queued.push_back(response));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.with(|s| s.requests.clone())
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.requests().iter().filter(|r| r.path.ends_with(suffix)).count()
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if let Some(queued) = state.queued.pop_front() {
            return queued;
        }

        let parts: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let body = request.body.clone().unwrap_or(Value::Null);
        match (request.method, parts.as_slice()) {
            (Method::Get, ["my", "ships"]) => {
                let mut ships: Vec<Ship> = state.ships.values().cloned().collect();
                ships.sort_by(|a, b| a.symbol.cmp(&b.symbol));
                page(request, ships)
            }
            (Method::Get, ["my", "ships", symbol]) => match state.ships.get_mut(*symbol) {
                Some(ship) => {
                    land_if_arrived(ship);
                    ok(json!(ship))
                }
                None => fail(404, 404, "ship not found"),
            },
            (Method::Post, ["my", "ships", symbol, action]) => {
                let symbol = symbol.to_string();
                if !state.ships.contains_key(&symbol) {
                    return fail(404, 404, "ship not found");
                }
                ship_action(&mut state, &symbol, action, &body)
            }
            (Method::Get, ["systems", system, "waypoints"]) => {
                let waypoints = state.waypoints.get(*system).cloned().unwrap_or_default();
                page(request, waypoints)
            }
            (Method::Get, ["systems", system, "waypoints", symbol]) => {
                let found = state
                    .waypoints
                    .get(*system)
                    .and_then(|wps| wps.iter().find(|w| w.symbol == *symbol).cloned());
                match found {
                    Some(w) => ok(json!(w)),
                    None => fail(404, 404, "waypoint not found"),
                }
            }
            (Method::Get, ["systems", system, "waypoints", _, "jump-gate"]) => {
                let connections = state.gates.get(*system).cloned().unwrap_or_default();
                let connections: Vec<String> = connections.iter().map(|c| gate_of(c)).collect();
                ok(json!({ "symbol": gate_of(system), "connections": connections }))
            }
            _ => fail(404, 404, "no such endpoint"),
        }
    }
}

#[async_trait]
impl Transport for FakeWorld {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        Ok(self.handle(request))
    }
}

fn ship_action(state: &mut WorldState, symbol: &str, action: &str, body: &Value) -> ApiResponse {
    let now = Utc::now();
    let per_extract = state.yields.get(symbol).copied().unwrap_or(10);
    let yield_good = state.yield_good.clone();

    match action {
        "orbit" | "dock" => {
            let ship = state.ships.get_mut(symbol).unwrap();
            ship.nav.status = if action == "orbit" { "IN_ORBIT" } else { "DOCKED" }.to_string();
            ok(json!({ "nav": ship.nav }))
        }
        "navigate" => {
            let target = body["waypointSymbol"].as_str().unwrap_or_default().to_string();
            let ship = state.ships.get_mut(symbol).unwrap();
            ship.nav.waypoint_symbol = target;
            ship.nav.status = "IN_ORBIT".to_string();
            ship.nav.route = Some(ShipRoute { departure_time: now, arrival: now });
            ok(json!({ "nav": ship.nav, "fuel": { "current": 100, "capacity": 100 } }))
        }
        "refuel" => ok(json!({ "fuel": { "current": 100, "capacity": 100 } })),
        "jump" => {
            let system = body["systemSymbol"].as_str().unwrap_or_default().to_string();
            let ship = state.ships.get_mut(symbol).unwrap();
            ship.nav.waypoint_symbol = gate_of(&system);
            ship.nav.system_symbol = system;
            ship.nav.status = "IN_ORBIT".to_string();
            ok(json!({ "nav": ship.nav, "cooldown": cooldown(symbol, 0) }))
        }
        "survey" => ok(json!({ "cooldown": cooldown(symbol, 0), "surveys": state.survey_results })),
        "extract" => {
            let signature = body.get("survey").and_then(|s| s["signature"].as_str()).map(String::from);
            if let Some(sig) = &signature {
                if state.exhausted_signatures.contains(sig) {
                    state.extract_vouchers.push(signature.clone());
                    return fail(400, 4224, "Survey has been exhausted");
                }
            }
            state.extract_vouchers.push(signature);
            let ship = state.ships.get_mut(symbol).unwrap();
            if ship.nav.status != "IN_ORBIT" {
                return fail(400, 4236, "Ship must be in orbit to extract");
            }
            let units = per_extract.min(ship.cargo.capacity - ship.cargo.units);
            add_cargo(&mut ship.cargo, &yield_good, units);
            ok(json!({
                "cooldown": cooldown(symbol, 0),
                "extraction": { "shipSymbol": symbol, "yield": { "symbol": yield_good, "units": units } },
                "cargo": ship.cargo,
            }))
        }
        "sell" => {
            let good = body["symbol"].as_str().unwrap_or_default().to_string();
            let units = body["units"].as_u64().unwrap_or(0) as u32;
            let ship = state.ships.get_mut(symbol).unwrap();
            if ship.nav.status != "DOCKED" {
                return fail(400, 4244, "Ship must be docked to sell");
            }
            remove_cargo(&mut ship.cargo, &good, units);
            ok(json!({
                "cargo": ship.cargo,
                "transaction": { "tradeSymbol": good, "units": units, "totalPrice": units as i64 * 10 },
            }))
        }
        "transfer" => {
            let good = body["tradeSymbol"].as_str().unwrap_or_default().to_string();
            let units = body["units"].as_u64().unwrap_or(0) as u32;
            let target = body["shipSymbol"].as_str().unwrap_or_default().to_string();

            let Some(receiver) = state.ships.get(&target) else {
                return fail(404, 404, "target ship not found");
            };
            let held = state.ships[symbol].cargo.inventory.iter().filter(|i| i.symbol == good).map(|i| i.units).sum::<u32>();
            if held < units {
                return fail(400, 4219, "Not enough cargo");
            }
            if receiver.cargo.capacity - receiver.cargo.units < units {
                return fail(400, 4217, "Target cargo hold is full");
            }
            if receiver.nav.waypoint_symbol != state.ships[symbol].nav.waypoint_symbol {
                return fail(400, 4214, "Ships are not at the same waypoint");
            }

            remove_cargo(&mut state.ships.get_mut(symbol).unwrap().cargo, &good, units);
            add_cargo(&mut state.ships.get_mut(&target).unwrap().cargo, &good, units);
            let cargo = state.ships[symbol].cargo.clone();
            if state.echo_target_cargo {
                ok(json!({ "cargo": cargo, "targetCargo": state.ships[&target].cargo }))
            } else {
                ok(json!({ "cargo": cargo }))
            }
        }
        _ => fail(404, 404, "no such action"),
    }
}

fn land_if_arrived(ship: &mut Ship) {
    let arrived = ship.nav.route.as_ref().is_some_and(|route| route.arrival <= Utc::now());
    if ship.nav.status == "IN_TRANSIT" && arrived {
        ship.nav.status = "IN_ORBIT".to_string();
    }
}

fn page<T: serde::Serialize>(request: &ApiRequest, items: Vec<T>) -> ApiResponse {
    let limit = request
        .query
        .iter()
        .find(|(k, _)| k == "limit")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(20);
    let page = request.page().unwrap_or(1) as usize;
    let total = items.len();
    let slice: Vec<T> = items.into_iter().skip((page - 1) * limit).take(limit).collect();
    raw(200, json!({ "data": slice, "meta": { "total": total, "page": page, "limit": limit } }))
}

fn add_cargo(cargo: &mut ShipCargo, good: &str, units: u32) {
    if units == 0 {
        return;
    }
    match cargo.inventory.iter_mut().find(|i| i.symbol == good) {
        Some(item) => item.units += units,
        None => cargo.inventory.push(CargoItem { symbol: good.to_string(), units }),
    }
    cargo.units += units;
}

fn remove_cargo(cargo: &mut ShipCargo, good: &str, units: u32) {
    if let Some(item) = cargo.inventory.iter_mut().find(|i| i.symbol == good) {
        item.units -= units;
    }
    cargo.inventory.retain(|i| i.units > 0);
    cargo.units -= units;
}

fn cooldown(symbol: &str, remaining: u64) -> Value {
    json!({ "shipSymbol": symbol, "totalSeconds": remaining, "remainingSeconds": remaining })
}

pub fn raw(status: u16, body: Value) -> ApiResponse {
    ApiResponse { status, body: body.to_string(), retry_after: None }
}

pub fn ok(data: Value) -> ApiResponse {
    raw(200, json!({ "data": data }))
}

pub fn fail(status: u16, code: i64, message: &str) -> ApiResponse {
    raw(status, json!({ "error": { "code": code, "message": message } }))
}

pub fn gate_of(system: &str) -> String {
    format!("{}-GATE", system)
}

pub fn waypoint(symbol: &str, kind: &str, traits: &[&str]) -> Waypoint {
    Waypoint {
        symbol: symbol.to_string(),
        waypoint_type: kind.to_string(),
        system_symbol: system_of(symbol),
        x: 0,
        y: 0,
        traits: traits.iter().map(|t| Trait { symbol: t.to_string() }).collect(),
    }
}

pub fn ship(symbol: &str, role: &str, at: &str, capacity: u32) -> Ship {
    Ship {
        symbol: symbol.to_string(),
        registration: ShipRegistration {
            name: symbol.to_string(),
            faction_symbol: "COSMIC".to_string(),
            role: role.to_string(),
        },
        nav: ShipNav {
            system_symbol: system_of(at),
            waypoint_symbol: at.to_string(),
            route: None,
            status: "IN_ORBIT".to_string(),
            flight_mode: "CRUISE".to_string(),
        },
        cargo: ShipCargo { capacity, units: 0, inventory: Vec::new() },
        cooldown: None,
        fuel: None,
        mounts: Vec::new(),
    }
}

/// Put `ship` mid-flight, landing `seconds` from now (negative: already due).
pub fn in_transit(mut ship: Ship, seconds: i64) -> Ship {
    let now = Utc::now();
    ship.nav.status = "IN_TRANSIT".to_string();
    ship.nav.route = Some(ShipRoute { departure_time: now, arrival: now + ChronoDuration::seconds(seconds) });
    ship
}

pub fn with_cargo(mut ship: Ship, good: &str, units: u32) -> Ship {
    add_cargo(&mut ship.cargo, good, units);
    ship
}

pub fn survey(signature: &str, waypoint: &str, goods: &[&str], ttl_minutes: i64) -> Survey {
    Survey {
        signature: signature.to_string(),
        symbol: waypoint.to_string(),
        deposits: goods.iter().map(|g| SurveyDeposit { symbol: g.to_string() }).collect(),
        expiration: Utc::now() + ChronoDuration::minutes(ttl_minutes),
        size: "MODERATE".to_string(),
    }
}

/// Gateway over `world` with no rate-limit spacing.
pub fn gateway(world: &Arc<FakeWorld>) -> Gateway {
    Gateway::new(world.clone(), RateLimiter::new(Duration::ZERO), Arc::new(SystemClock))
}

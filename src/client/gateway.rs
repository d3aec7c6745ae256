use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::action::Action;
use crate::client::rate_limiter::RateLimiter;
use crate::client::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::clock::Clock;
use crate::config::ApiConfig;
use crate::error::{CoordError, Result};
use crate::models::*;

/// API error code for an action attempted while the ship is on cooldown
pub const COOLDOWN_CONFLICT_CODE: i64 = 4000;

/// Extra wait added on top of a server-reported cooldown
const COOLDOWN_MARGIN: Duration = Duration::from_secs(1);

/// Single choke point for every call to the remote API.
///
/// Owns the process-wide rate limit, transparent pagination and the retry
/// policy: one automatic retry after a 429 and one after a cooldown conflict,
/// each after the delay the server asked for. Any other failure comes back as
/// [`CoordError::ActionFailed`].
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    page_limit: u32,
    fallback_retry: Duration,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, limiter: RateLimiter, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            limiter,
            clock,
            page_limit: 20,
            fallback_retry: Duration::from_secs(120),
        }
    }

    /// Real HTTP gateway sharing the process-wide rate limiter.
    pub fn from_config(api: &ApiConfig, token: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let transport = HttpTransport::new(&api.base_url, token, Duration::from_secs(api.request_timeout_seconds))?;
        let limiter = RateLimiter::process_wide(Duration::from_millis(api.min_interval_ms));
        Ok(Self::new(Arc::new(transport), limiter, clock)
            .with_page_limit(api.page_limit)
            .with_fallback_retry(Duration::from_secs_f64(api.fallback_retry_seconds.max(0.0))))
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn with_fallback_retry(mut self, fallback_retry: Duration) -> Self {
        self.fallback_retry = fallback_retry;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue one action and return its `data` payload. List reads return
    /// every page concatenated into one array.
    pub async fn execute(&self, action: &Action) -> Result<Value> {
        if action.is_paginated() {
            return self.fetch_all_pages(action).await;
        }
        let envelope = self.send_with_retry(action, &action.request()).await?;
        Ok(envelope.data)
    }

    pub async fn execute_as<T: DeserializeOwned>(&self, action: &Action) -> Result<T> {
        let data = self.execute(action).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn fetch_all_pages(&self, action: &Action) -> Result<Value> {
        let first = action.request().with_page(1, self.page_limit);
        let envelope = self.send_with_retry(action, &first).await?;
        let mut items = into_array(envelope.data)?;

        if let Some(meta) = envelope.meta.filter(|m| m.total > m.limit) {
            debug!("📄 {} spans {} pages ({} items)", action.name(), meta.page_count(), meta.total);
            for page in 2..=meta.page_count() {
                let request = action.request().with_page(page, meta.limit);
                let envelope = self.send_with_retry(action, &request).await?;
                items.extend(into_array(envelope.data)?);
            }
        }

        Ok(Value::Array(items))
    }

    async fn send_with_retry(&self, action: &Action, request: &ApiRequest) -> Result<Envelope> {
        match self.send_once(request).await {
            Err(CoordError::RateLimited { retry_after_secs }) => {
                warn!(
                    action = action.name(),
                    ship = action.ship().unwrap_or("-"),
                    "⏳ Rate limited, retrying once in {:.1}s",
                    retry_after_secs
                );
                sleep(Duration::from_secs_f64(retry_after_secs.max(0.0))).await;
                self.send_once(request).await
            }
            Err(CoordError::CooldownConflict { remaining_seconds }) => {
                warn!(
                    action = action.name(),
                    ship = action.ship().unwrap_or("-"),
                    "⏳ Cooldown conflict, retrying once in {}s",
                    remaining_seconds
                );
                sleep(Duration::from_secs(remaining_seconds) + COOLDOWN_MARGIN).await;
                self.send_once(request).await
            }
            other => other,
        }
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Envelope> {
        self.limiter.acquire().await;
        let response = self.transport.send(request).await?;
        self.classify(response)
    }

    fn classify(&self, response: ApiResponse) -> Result<Envelope> {
        if response.is_success() {
            if response.body.trim().is_empty() {
                return Ok(Envelope { data: Value::Null, meta: None });
            }
            return Ok(serde_json::from_str(&response.body)?);
        }

        let error = serde_json::from_str::<ErrorEnvelope>(&response.body).ok().map(|e| e.error);

        if response.status == 429 {
            let retry_after_secs = response
                .retry_after
                .or_else(|| error.as_ref().and_then(|e| e.retry_after()))
                .unwrap_or(self.fallback_retry.as_secs_f64());
            return Err(CoordError::RateLimited { retry_after_secs });
        }

        match error {
            Some(error) if error.code == COOLDOWN_CONFLICT_CODE => match error.cooldown_remaining() {
                Some(remaining_seconds) => Err(CoordError::CooldownConflict { remaining_seconds }),
                None => Err(CoordError::ActionFailed { code: error.code, message: error.message }),
            },
            Some(error) => Err(CoordError::ActionFailed { code: error.code, message: error.message }),
            None => Err(CoordError::ActionFailed {
                code: response.status as i64,
                message: response.body,
            }),
        }
    }

    // Reads

    pub async fn ship(&self, symbol: &str) -> Result<Ship> {
        self.execute_as(&Action::GetShip { ship: symbol.to_string() }).await
    }

    pub async fn ships(&self) -> Result<Vec<Ship>> {
        self.execute_as(&Action::ListShips).await
    }

    /// Fetch a fresh snapshot of one agent.
    pub async fn load_agent(&self, symbol: &str) -> Result<Agent> {
        let ship = self.ship(symbol).await?;
        Ok(Agent::from_ship(&ship, self.clock.now()))
    }

    /// Lazily re-mirror remote state before a decision point.
    pub async fn refresh(&self, agent: &mut Agent) -> Result<()> {
        let ship = self.ship(&agent.symbol).await?;
        agent.refresh_from(&ship, self.clock.now());
        Ok(())
    }

    /// Sleep until an in-transit agent has landed, then re-read it. Agents
    /// not in transit are left untouched.
    pub async fn wait_for_arrival(&self, agent: &mut Agent) -> Result<()> {
        if agent.nav_status != NavStatus::InTransit {
            return Ok(());
        }
        let remaining = agent.transit_remaining(self.clock.now());
        debug!(ship = %agent.symbol, "🛬 Waiting {:?} for arrival", remaining);
        sleep(remaining + Duration::from_secs(1)).await;
        self.refresh(agent).await
    }

    pub async fn waypoint(&self, system: &str, waypoint: &str) -> Result<Waypoint> {
        self.execute_as(&Action::GetWaypoint { system: system.to_string(), waypoint: waypoint.to_string() })
            .await
    }

    pub async fn waypoints(&self, system: &str) -> Result<Vec<Waypoint>> {
        self.execute_as(&Action::ListWaypoints { system: system.to_string() }).await
    }

    pub async fn market(&self, system: &str, waypoint: &str) -> Result<Market> {
        self.execute_as(&Action::GetMarket { system: system.to_string(), waypoint: waypoint.to_string() })
            .await
    }

    pub async fn shipyard(&self, system: &str, waypoint: &str) -> Result<Shipyard> {
        self.execute_as(&Action::GetShipyard { system: system.to_string(), waypoint: waypoint.to_string() })
            .await
    }

    pub async fn jump_gate(&self, system: &str, waypoint: &str) -> Result<JumpGate> {
        self.execute_as(&Action::GetJumpGate { system: system.to_string(), waypoint: waypoint.to_string() })
            .await
    }

    // Ship actions. Each one mirrors the returned state onto the agent.

    pub async fn orbit(&self, agent: &mut Agent) -> Result<()> {
        let data: NavData = self.execute_as(&Action::Orbit { ship: agent.symbol.clone() }).await?;
        agent.apply_nav(&data.nav);
        Ok(())
    }

    pub async fn dock(&self, agent: &mut Agent) -> Result<()> {
        let data: NavData = self.execute_as(&Action::Dock { ship: agent.symbol.clone() }).await?;
        agent.apply_nav(&data.nav);
        Ok(())
    }

    pub async fn navigate(&self, agent: &mut Agent, waypoint: &str) -> Result<NavigationData> {
        let data: NavigationData = self
            .execute_as(&Action::Navigate { ship: agent.symbol.clone(), waypoint: waypoint.to_string() })
            .await?;
        agent.apply_nav(&data.nav);
        Ok(data)
    }

    pub async fn refuel(&self, agent: &mut Agent) -> Result<RefuelData> {
        self.execute_as(&Action::Refuel { ship: agent.symbol.clone() }).await
    }

    pub async fn extract(&self, agent: &mut Agent, survey: Option<&Survey>) -> Result<ExtractionData> {
        let data: ExtractionData = self
            .execute_as(&Action::Extract { ship: agent.symbol.clone(), survey: survey.cloned() })
            .await?;
        agent.apply_cargo(&data.cargo);
        agent.apply_cooldown(&data.cooldown, self.clock.now());
        Ok(data)
    }

    pub async fn survey(&self, agent: &mut Agent) -> Result<SurveyData> {
        let data: SurveyData = self.execute_as(&Action::Survey { ship: agent.symbol.clone() }).await?;
        agent.apply_cooldown(&data.cooldown, self.clock.now());
        Ok(data)
    }

    pub async fn sell(&self, agent: &mut Agent, good: &str, units: u32) -> Result<TradeData> {
        let data: TradeData = self
            .execute_as(&Action::Sell { ship: agent.symbol.clone(), good: good.to_string(), units })
            .await?;
        agent.apply_cargo(&data.cargo);
        Ok(data)
    }

    pub async fn purchase(&self, agent: &mut Agent, good: &str, units: u32) -> Result<TradeData> {
        let data: TradeData = self
            .execute_as(&Action::Purchase { ship: agent.symbol.clone(), good: good.to_string(), units })
            .await?;
        agent.apply_cargo(&data.cargo);
        Ok(data)
    }

    pub async fn jump(&self, agent: &mut Agent, system: &str) -> Result<JumpData> {
        let data: JumpData = self
            .execute_as(&Action::Jump { ship: agent.symbol.clone(), system: system.to_string() })
            .await?;
        agent.apply_nav(&data.nav);
        agent.apply_cooldown(&data.cooldown, self.clock.now());
        Ok(data)
    }

    pub async fn transfer(&self, agent: &mut Agent, good: &str, units: u32, to: &str) -> Result<TransferCargoData> {
        let data: TransferCargoData = self
            .execute_as(&Action::Transfer {
                ship: agent.symbol.clone(),
                good: good.to_string(),
                units,
                to: to.to_string(),
            })
            .await?;
        agent.apply_cargo(&data.cargo);
        Ok(data)
    }
}

fn into_array(data: Value) -> Result<Vec<Value>> {
    match data {
        Value::Array(items) => Ok(items),
        other => Err(CoordError::UnexpectedResponse(format!("expected a list, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::Method;
    use crate::clock::SystemClock;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Hands out canned responses in order and records every request.
    struct Scripted {
        responses: Mutex<VecDeque<ApiResponse>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<ApiResponse>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), seen: Mutex::new(Vec::new()) })
        }

        fn seen(&self) -> Vec<ApiRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.responses.lock().unwrap().pop_front().expect("script exhausted"))
        }
    }

    fn reply(status: u16, body: Value) -> ApiResponse {
        ApiResponse { status, body: body.to_string(), retry_after: None }
    }

    fn gateway(transport: Arc<Scripted>) -> Gateway {
        Gateway::new(transport, RateLimiter::new(Duration::from_millis(1)), Arc::new(SystemClock))
    }

    fn nav_body(status: &str) -> Value {
        json!({ "data": { "nav": {
            "systemSymbol": "X1-A", "waypointSymbol": "X1-A-1", "status": status
        }}})
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_the_indicated_delay_then_retries_once() {
        let transport = Scripted::new(vec![
            ApiResponse {
                status: 429,
                body: json!({ "error": { "code": 429, "message": "slow down" } }).to_string(),
                retry_after: Some(5.0),
            },
            reply(200, nav_body("IN_ORBIT")),
        ]);
        let gateway = gateway(transport.clone());
        let start = Instant::now();

        let data = gateway.execute(&Action::Orbit { ship: "S-1".to_string() }).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(data["nav"]["status"], "IN_ORBIT");
        assert_eq!(transport.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_delay_can_come_from_error_payload() {
        let transport = Scripted::new(vec![
            reply(429, json!({ "error": { "code": 429, "message": "", "data": { "retryAfter": 3.5 } } })),
            reply(200, nav_body("DOCKED")),
        ]);
        let gateway = gateway(transport);
        let start = Instant::now();

        gateway.execute(&Action::Dock { ship: "S-1".to_string() }).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_conflict_waits_remaining_seconds_then_retries_once() {
        let conflict = json!({ "error": {
            "code": 4000,
            "message": "Ship action is still on cooldown",
            "data": { "cooldown": { "shipSymbol": "S-1", "totalSeconds": 70, "remainingSeconds": 12 } }
        }});
        let transport = Scripted::new(vec![reply(409, conflict), reply(200, nav_body("IN_ORBIT"))]);
        let gateway = gateway(transport.clone());
        let start = Instant::now();

        gateway.execute(&Action::Orbit { ship: "S-1".to_string() }).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(12));
        assert_eq!(transport.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_rate_limit_is_surfaced_not_retried_again() {
        let limited = ApiResponse { status: 429, body: String::new(), retry_after: Some(1.0) };
        let transport = Scripted::new(vec![limited.clone(), limited]);
        let gateway = gateway(transport.clone());

        let err = gateway.execute(&Action::Orbit { ship: "S-1".to_string() }).await.unwrap_err();

        assert!(matches!(err, CoordError::RateLimited { .. }));
        assert_eq!(transport.seen().len(), 2);
    }

    #[tokio::test]
    async fn other_failures_become_action_failed() {
        let transport = Scripted::new(vec![reply(
            400,
            json!({ "error": { "code": 4204, "message": "Ship is not at a market" } }),
        )]);
        let gateway = gateway(transport.clone());

        let err = gateway.execute(&Action::Refuel { ship: "S-1".to_string() }).await.unwrap_err();

        match err {
            CoordError::ActionFailed { code, message } => {
                assert_eq!(code, 4204);
                assert!(message.contains("market"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn unparseable_failure_keeps_status_and_body() {
        let transport = Scripted::new(vec![ApiResponse {
            status: 502,
            body: "bad gateway".to_string(),
            retry_after: None,
        }]);
        let err = gateway(transport).execute(&Action::ListShips).await.unwrap_err();
        assert_eq!(err.api_code(), Some(502));
    }

    #[tokio::test]
    async fn paginated_reads_are_concatenated() {
        let wp = |n: u32| json!({ "symbol": format!("X1-A-{}", n), "type": "PLANET", "systemSymbol": "X1-A" });
        let transport = Scripted::new(vec![
            reply(200, json!({ "data": [wp(1), wp(2)], "meta": { "total": 5, "page": 1, "limit": 2 } })),
            reply(200, json!({ "data": [wp(3), wp(4)], "meta": { "total": 5, "page": 2, "limit": 2 } })),
            reply(200, json!({ "data": [wp(5)], "meta": { "total": 5, "page": 3, "limit": 2 } })),
        ]);
        let gateway = gateway(transport.clone()).with_page_limit(2);

        let waypoints = gateway.waypoints("X1-A").await.unwrap();

        assert_eq!(waypoints.len(), 5);
        assert_eq!(waypoints[4].symbol, "X1-A-5");
        let pages: Vec<Option<u32>> = transport.seen().iter().map(|r| r.page()).collect();
        assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
        assert!(transport.seen().iter().all(|r| r.method == Method::Get));
    }

    #[tokio::test]
    async fn single_page_reads_stop_after_first_call() {
        let transport = Scripted::new(vec![reply(
            200,
            json!({ "data": [], "meta": { "total": 0, "page": 1, "limit": 20 } }),
        )]);
        let gateway = gateway(transport.clone());

        assert!(gateway.ships().await.unwrap().is_empty());
        assert_eq!(transport.seen().len(), 1);
    }
}

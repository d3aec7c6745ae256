use serde_json::json;

use crate::client::transport::ApiRequest;
use crate::models::Survey;

/// Every remote call the coordination core makes.
#[derive(Debug, Clone)]
pub enum Action {
    Navigate { ship: String, waypoint: String },
    Dock { ship: String },
    Orbit { ship: String },
    Refuel { ship: String },
    Extract { ship: String, survey: Option<Survey> },
    Survey { ship: String },
    Sell { ship: String, good: String, units: u32 },
    Purchase { ship: String, good: String, units: u32 },
    Jump { ship: String, system: String },
    Transfer { ship: String, good: String, units: u32, to: String },
    GetShip { ship: String },
    ListShips,
    GetWaypoint { system: String, waypoint: String },
    ListWaypoints { system: String },
    GetMarket { system: String, waypoint: String },
    GetShipyard { system: String, waypoint: String },
    GetJumpGate { system: String, waypoint: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Dock { .. } => "dock",
            Action::Orbit { .. } => "orbit",
            Action::Refuel { .. } => "refuel",
            Action::Extract { .. } => "extract",
            Action::Survey { .. } => "survey",
            Action::Sell { .. } => "sell",
            Action::Purchase { .. } => "purchase",
            Action::Jump { .. } => "jump",
            Action::Transfer { .. } => "transfer",
            Action::GetShip { .. } => "get_ship",
            Action::ListShips => "list_ships",
            Action::GetWaypoint { .. } => "get_waypoint",
            Action::ListWaypoints { .. } => "list_waypoints",
            Action::GetMarket { .. } => "get_market",
            Action::GetShipyard { .. } => "get_shipyard",
            Action::GetJumpGate { .. } => "get_jump_gate",
        }
    }

    /// Ship addressed by the call, if any.
    pub fn ship(&self) -> Option<&str> {
        match self {
            Action::Navigate { ship, .. }
            | Action::Dock { ship }
            | Action::Orbit { ship }
            | Action::Refuel { ship }
            | Action::Extract { ship, .. }
            | Action::Survey { ship }
            | Action::Sell { ship, .. }
            | Action::Purchase { ship, .. }
            | Action::Jump { ship, .. }
            | Action::Transfer { ship, .. }
            | Action::GetShip { ship } => Some(ship.as_str()),
            _ => None,
        }
    }

    /// List reads carry `{ meta: { total, limit } }` and may span pages.
    pub fn is_paginated(&self) -> bool {
        matches!(self, Action::ListShips | Action::ListWaypoints { .. })
    }

    pub fn request(&self) -> ApiRequest {
        match self {
            Action::Navigate { ship, waypoint } => ApiRequest::post(
                format!("/my/ships/{}/navigate", ship),
                json!({ "waypointSymbol": waypoint }),
            ),
            Action::Dock { ship } => ApiRequest::post(format!("/my/ships/{}/dock", ship), json!({})),
            Action::Orbit { ship } => ApiRequest::post(format!("/my/ships/{}/orbit", ship), json!({})),
            Action::Refuel { ship } => ApiRequest::post(format!("/my/ships/{}/refuel", ship), json!({})),
            Action::Extract { ship, survey } => {
                let body = match survey {
                    Some(survey) => json!({ "survey": survey }),
                    None => json!({}),
                };
                ApiRequest::post(format!("/my/ships/{}/extract", ship), body)
            }
            Action::Survey { ship } => ApiRequest::post(format!("/my/ships/{}/survey", ship), json!({})),
            Action::Sell { ship, good, units } => ApiRequest::post(
                format!("/my/ships/{}/sell", ship),
                json!({ "symbol": good, "units": units }),
            ),
            Action::Purchase { ship, good, units } => ApiRequest::post(
                format!("/my/ships/{}/purchase", ship),
                json!({ "symbol": good, "units": units }),
            ),
            Action::Jump { ship, system } => ApiRequest::post(
                format!("/my/ships/{}/jump", ship),
                json!({ "systemSymbol": system }),
            ),
            Action::Transfer { ship, good, units, to } => ApiRequest::post(
                format!("/my/ships/{}/transfer", ship),
                json!({ "tradeSymbol": good, "units": units, "shipSymbol": to }),
            ),
            Action::GetShip { ship } => ApiRequest::get(format!("/my/ships/{}", ship)),
            Action::ListShips => ApiRequest::get("/my/ships"),
            Action::GetWaypoint { system, waypoint } => {
                ApiRequest::get(format!("/systems/{}/waypoints/{}", system, waypoint))
            }
            Action::ListWaypoints { system } => ApiRequest::get(format!("/systems/{}/waypoints", system)),
            Action::GetMarket { system, waypoint } => {
                ApiRequest::get(format!("/systems/{}/waypoints/{}/market", system, waypoint))
            }
            Action::GetShipyard { system, waypoint } => {
                ApiRequest::get(format!("/systems/{}/waypoints/{}/shipyard", system, waypoint))
            }
            Action::GetJumpGate { system, waypoint } => {
                ApiRequest::get(format!("/systems/{}/waypoints/{}/jump-gate", system, waypoint))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::Method;

    #[test]
    fn transfer_names_both_ships() {
        let request = Action::Transfer {
            ship: "MINER-1".to_string(),
            good: "IRON_ORE".to_string(),
            units: 20,
            to: "HAULER-1".to_string(),
        }
        .request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/my/ships/MINER-1/transfer");
        let body = request.body.unwrap();
        assert_eq!(body["shipSymbol"], "HAULER-1");
        assert_eq!(body["units"], 20);
    }

    #[test]
    fn extract_without_voucher_sends_empty_body() {
        let request = Action::Extract { ship: "MINER-1".to_string(), survey: None }.request();
        assert_eq!(request.body, Some(json!({})));
    }

    #[test]
    fn only_list_reads_paginate() {
        assert!(Action::ListWaypoints { system: "X1-A".to_string() }.is_paginated());
        assert!(!Action::GetShip { ship: "S".to_string() }.is_paginated());
        assert_eq!(Action::Dock { ship: "S".to_string() }.ship(), Some("S"));
        assert_eq!(Action::ListShips.ship(), None);
    }
}

use serde::{Deserialize, Serialize};

use crate::models::ship::{ShipCooldown, ShipNav};
use crate::models::waypoint::system_of;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JumpGate {
    #[serde(rename = "jumpRange", default)]
    pub jump_range: Option<i32>,
    #[serde(rename = "connectedSystems", default)]
    pub connected_systems: Vec<ConnectedSystem>,
    /// Newer API revisions list gate waypoint symbols instead of systems
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectedSystem {
    pub symbol: String,
    #[serde(default)]
    pub distance: Option<i32>,
}

impl JumpGate {
    /// Every system reachable in one jump, whichever shape the server used.
    pub fn neighbour_systems(&self) -> Vec<String> {
        let mut systems: Vec<String> = self
            .connected_systems
            .iter()
            .map(|s| s.symbol.clone())
            .chain(self.connections.iter().map(|w| system_of(w)))
            .collect();
        systems.sort();
        systems.dedup();
        systems
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JumpData {
    pub cooldown: ShipCooldown,
    pub nav: ShipNav,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_merge_both_wire_shapes() {
        let gate: JumpGate = serde_json::from_value(serde_json::json!({
            "connectedSystems": [{ "symbol": "X1-B", "distance": 40 }],
            "connections": ["X1-C-GATE", "X1-B-GATE"]
        }))
        .unwrap();
        assert_eq!(gate.neighbour_systems(), vec!["X1-B".to_string(), "X1-C".to_string()]);
    }
}

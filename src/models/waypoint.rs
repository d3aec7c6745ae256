use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Waypoint {
    pub symbol: String,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    #[serde(rename = "systemSymbol")]
    pub system_symbol: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub traits: Vec<Trait>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Trait {
    pub symbol: String,
}

impl Waypoint {
    pub fn has_trait(&self, symbol: &str) -> bool {
        self.traits.iter().any(|t| t.symbol == symbol)
    }

    pub fn has_market(&self) -> bool {
        self.has_trait("MARKETPLACE")
    }

    pub fn has_shipyard(&self) -> bool {
        self.has_trait("SHIPYARD")
    }

    pub fn is_asteroid_field(&self) -> bool {
        matches!(self.waypoint_type.as_str(), "ASTEROID_FIELD" | "ASTEROID" | "ENGINEERED_ASTEROID")
    }

    pub fn is_jump_gate(&self) -> bool {
        self.waypoint_type == "JUMP_GATE"
    }
}

/// System part of a waypoint symbol: `X1-YU85-76885D` -> `X1-YU85`.
pub fn system_of(waypoint_symbol: &str) -> String {
    waypoint_symbol.splitn(3, '-').take(2).collect::<Vec<_>>().join("-")
}

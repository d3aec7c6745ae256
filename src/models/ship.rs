use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Wire shape of a ship as returned by /my/ships. Only the parts the
// coordination core reads are modelled; everything else is ignored.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Ship {
    pub symbol: String,
    pub registration: ShipRegistration,
    pub nav: ShipNav,
    pub cargo: ShipCargo,
    #[serde(default)]
    pub cooldown: Option<ShipCooldown>,
    #[serde(default)]
    pub fuel: Option<ShipFuel>,
    #[serde(default)]
    pub mounts: Vec<ShipMount>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipRegistration {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "factionSymbol", default)]
    pub faction_symbol: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipNav {
    #[serde(rename = "systemSymbol")]
    pub system_symbol: String,
    #[serde(rename = "waypointSymbol")]
    pub waypoint_symbol: String,
    #[serde(default)]
    pub route: Option<ShipRoute>,
    pub status: String,
    #[serde(rename = "flightMode", default)]
    pub flight_mode: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipRoute {
    #[serde(rename = "departureTime")]
    pub departure_time: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

impl ShipRoute {
    /// Seconds between departure and arrival, never negative.
    pub fn travel_seconds(&self) -> u64 {
        (self.arrival - self.departure_time).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipCooldown {
    #[serde(rename = "shipSymbol", default)]
    pub ship_symbol: String,
    #[serde(rename = "totalSeconds", default)]
    pub total_seconds: u64,
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u64,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ShipCargo {
    pub capacity: u32,
    pub units: u32,
    #[serde(default)]
    pub inventory: Vec<CargoItem>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CargoItem {
    pub symbol: String,
    pub units: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipFuel {
    pub current: u32,
    pub capacity: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShipMount {
    pub symbol: String,
}

impl Ship {
    pub fn has_surveyor(&self) -> bool {
        self.mounts.iter().any(|m| m.symbol.starts_with("MOUNT_SURVEYOR"))
    }
}

// Navigation-related structures
#[derive(Debug, Deserialize, Clone)]
pub struct NavigationData {
    pub nav: ShipNav,
    #[serde(default)]
    pub fuel: Option<ShipFuel>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NavData {
    pub nav: ShipNav,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefuelData {
    pub fuel: ShipFuel,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CargoData {
    pub cargo: ShipCargo,
}

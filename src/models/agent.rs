// Live mirror of one remotely-controlled ship
use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::models::ship::{CargoItem, Ship, ShipCargo, ShipCooldown, ShipNav};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Command,
    Excavator,
    Hauler,
    Satellite,
    Surveyor,
    Other(String),
}

impl AgentRole {
    pub fn parse(role: &str) -> Self {
        match role.to_ascii_uppercase().as_str() {
            "COMMAND" => AgentRole::Command,
            "EXCAVATOR" => AgentRole::Excavator,
            "HAULER" => AgentRole::Hauler,
            "SATELLITE" => AgentRole::Satellite,
            "SURVEYOR" => AgentRole::Surveyor,
            other => AgentRole::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Command => "COMMAND",
            AgentRole::Excavator => "EXCAVATOR",
            AgentRole::Hauler => "HAULER",
            AgentRole::Satellite => "SATELLITE",
            AgentRole::Surveyor => "SURVEYOR",
            AgentRole::Other(role) => role,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    InTransit,
    InOrbit,
    Docked,
}

impl NavStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "DOCKED" => NavStatus::Docked,
            "IN_TRANSIT" => NavStatus::InTransit,
            _ => NavStatus::InOrbit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub system: String,
    pub waypoint: String,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub symbol: String,
    pub role: AgentRole,
    pub location: Location,
    pub nav_status: NavStatus,
    /// Reported arrival of the current or last flight
    pub arrival: Option<DateTime<Utc>>,
    pub cargo: ShipCargo,
    pub cooldown_expiry: Option<DateTime<Utc>>,
    pub can_survey: bool,
    pub refreshed_at: DateTime<Utc>,
}

impl Agent {
    pub fn from_ship(ship: &Ship, now: DateTime<Utc>) -> Self {
        let mut agent = Self {
            symbol: ship.symbol.clone(),
            role: AgentRole::parse(&ship.registration.role),
            location: Location {
                system: ship.nav.system_symbol.clone(),
                waypoint: ship.nav.waypoint_symbol.clone(),
            },
            nav_status: NavStatus::parse(&ship.nav.status),
            arrival: ship.nav.route.as_ref().map(|route| route.arrival),
            cargo: ship.cargo.clone(),
            cooldown_expiry: None,
            can_survey: ship.has_surveyor(),
            refreshed_at: now,
        };
        if let Some(cooldown) = &ship.cooldown {
            agent.apply_cooldown(cooldown, now);
        }
        agent
    }

    /// Replace everything but the identifier with a fresh remote snapshot.
    pub fn refresh_from(&mut self, ship: &Ship, now: DateTime<Utc>) {
        *self = Agent::from_ship(ship, now);
    }

    pub fn apply_nav(&mut self, nav: &ShipNav) {
        self.location.system = nav.system_symbol.clone();
        self.location.waypoint = nav.waypoint_symbol.clone();
        self.nav_status = NavStatus::parse(&nav.status);
        self.arrival = nav.route.as_ref().map(|route| route.arrival);
    }

    /// Time left before an in-transit agent lands. Zero when not in transit.
    pub fn transit_remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        match (self.nav_status, self.arrival) {
            (NavStatus::InTransit, Some(arrival)) => (arrival - now).to_std().unwrap_or_default(),
            _ => std::time::Duration::ZERO,
        }
    }

    pub fn apply_cargo(&mut self, cargo: &ShipCargo) {
        self.cargo = cargo.clone();
    }

    pub fn apply_cooldown(&mut self, cooldown: &ShipCooldown, now: DateTime<Utc>) {
        self.cooldown_expiry = match cooldown.expiration {
            Some(expiration) if cooldown.remaining_seconds > 0 => Some(expiration),
            _ if cooldown.remaining_seconds > 0 => {
                Some(now + Duration::seconds(cooldown.remaining_seconds as i64))
            }
            _ => None,
        };
    }

    pub fn spare_capacity(&self) -> u32 {
        self.cargo.capacity.saturating_sub(self.cargo.units)
    }

    pub fn is_full(&self) -> bool {
        self.spare_capacity() == 0
    }

    pub fn units_of(&self, good: &str) -> u32 {
        self.cargo
            .inventory
            .iter()
            .filter(|item| item.symbol == good)
            .map(|item| item.units)
            .sum()
    }

    pub fn inventory(&self) -> &[CargoItem] {
        &self.cargo.inventory
    }

    /// Time left before the agent's current action cooldown ends.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.cooldown_expiry
            .map(|expiry| (expiry - now).to_std().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Local bookkeeping for a transfer: remove `units` of `good`.
    pub fn remove_units(&mut self, good: &str, units: u32) {
        let mut left = units;
        for item in self.cargo.inventory.iter_mut().filter(|i| i.symbol == good) {
            let taken = item.units.min(left);
            item.units -= taken;
            left -= taken;
        }
        self.cargo.inventory.retain(|item| item.units > 0);
        self.cargo.units = self.cargo.units.saturating_sub(units - left);
    }

    /// Local bookkeeping for a received transfer when the server did not
    /// echo the receiver's cargo.
    pub fn add_units(&mut self, good: &str, units: u32) {
        match self.cargo.inventory.iter_mut().find(|i| i.symbol == good) {
            Some(item) => item.units += units,
            None => self.cargo.inventory.push(CargoItem { symbol: good.to_string(), units }),
        }
        self.cargo.units += units;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ship::{ShipRegistration, ShipRoute};

    fn ship(units: u32) -> Ship {
        Ship {
            symbol: "KITE-1".to_string(),
            registration: ShipRegistration {
                name: "KITE-1".to_string(),
                faction_symbol: "COSMIC".to_string(),
                role: "EXCAVATOR".to_string(),
            },
            nav: ShipNav {
                system_symbol: "X1-YU85".to_string(),
                waypoint_symbol: "X1-YU85-76885D".to_string(),
                route: None,
                status: "IN_ORBIT".to_string(),
                flight_mode: "CRUISE".to_string(),
            },
            cargo: ShipCargo {
                capacity: 40,
                units,
                inventory: vec![CargoItem { symbol: "IRON_ORE".to_string(), units }],
            },
            cooldown: None,
            fuel: None,
            mounts: vec![],
        }
    }

    #[test]
    fn snapshot_reads_wire_ship() {
        let agent = Agent::from_ship(&ship(12), Utc::now());
        assert_eq!(agent.role, AgentRole::Excavator);
        assert_eq!(agent.nav_status, NavStatus::InOrbit);
        assert_eq!(agent.spare_capacity(), 28);
        assert_eq!(agent.units_of("IRON_ORE"), 12);
        assert!(!agent.can_survey);
    }

    #[test]
    fn removing_units_drops_empty_lines() {
        let mut agent = Agent::from_ship(&ship(12), Utc::now());
        agent.remove_units("IRON_ORE", 12);
        assert_eq!(agent.cargo.units, 0);
        assert!(agent.inventory().is_empty());
    }

    #[test]
    fn cooldown_without_expiration_counts_from_now() {
        let now = Utc::now();
        let mut agent = Agent::from_ship(&ship(0), now);
        agent.apply_cooldown(
            &ShipCooldown {
                ship_symbol: "KITE-1".to_string(),
                total_seconds: 70,
                remaining_seconds: 70,
                expiration: None,
            },
            now,
        );
        assert_eq!(agent.cooldown_remaining(now).as_secs(), 70);
    }

    #[test]
    fn unknown_roles_are_preserved() {
        assert_eq!(AgentRole::parse("refinery").as_str(), "REFINERY");
        assert_eq!(AgentRole::parse("hauler"), AgentRole::Hauler);
    }

    #[test]
    fn transit_time_is_counted_only_while_in_transit() {
        let now = Utc::now();
        let mut wire = ship(0);
        wire.nav.status = "IN_TRANSIT".to_string();
        wire.nav.route = Some(ShipRoute { departure_time: now, arrival: now + Duration::seconds(42) });
        let mut agent = Agent::from_ship(&wire, now);
        assert_eq!(agent.transit_remaining(now).as_secs(), 42);

        agent.nav_status = NavStatus::InOrbit;
        assert!(agent.transit_remaining(now).is_zero());
    }
}

// Standing orders: which loop a worker runs for an agent
use std::fmt;

/// What a leased agent is told to do. Stored per agent in the shared store
/// so an operator can reassign a ship without touching its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orders {
    /// Extract at the mining waypoint and hand cargo off
    Mine,
    /// Wait at the mining waypoint for cargo, then sell it
    Haul,
    /// Leave the agent alone
    Idle,
}

impl Orders {
    pub fn parse(orders: &str) -> Option<Self> {
        match orders.to_ascii_lowercase().as_str() {
            "mine" => Some(Orders::Mine),
            "haul" => Some(Orders::Haul),
            "idle" => Some(Orders::Idle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orders::Mine => "mine",
            Orders::Haul => "haul",
            Orders::Idle => "idle",
        }
    }

    /// Effective orders for an agent: explicit orders win, otherwise the
    /// role decides.
    pub fn resolve(
        stored: Option<Orders>,
        role: &str,
        producer_roles: &[String],
        consumer_roles: &[String],
    ) -> Orders {
        if let Some(orders) = stored {
            return orders;
        }
        if producer_roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            Orders::Mine
        } else if consumer_roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            Orders::Haul
        } else {
            Orders::Idle
        }
    }
}

impl fmt::Display for Orders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

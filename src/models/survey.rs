use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ship::{ShipCargo, ShipCooldown};

// Mining and Survey structures
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Survey {
    pub signature: String,
    /// Waypoint the survey was taken at
    pub symbol: String,
    pub deposits: Vec<SurveyDeposit>,
    pub expiration: DateTime<Utc>,
    pub size: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SurveyDeposit {
    pub symbol: String,
}

impl Survey {
    pub fn contains(&self, good: &str) -> bool {
        self.deposits.iter().any(|d| d.symbol == good)
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiration > now
    }

    pub fn deposit_symbols(&self) -> Vec<String> {
        self.deposits.iter().map(|d| d.symbol.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct SurveyData {
    pub cooldown: ShipCooldown,
    pub surveys: Vec<Survey>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionData {
    pub cooldown: ShipCooldown,
    pub extraction: ExtractionResult,
    pub cargo: ShipCargo,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "shipSymbol")]
    pub ship_symbol: String,
    #[serde(rename = "yield")]
    pub extraction_yield: ExtractionYield,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionYield {
    pub symbol: String,
    pub units: u32,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ship::ShipCargo;

// Sell / purchase share one response shape
#[derive(Debug, Deserialize)]
pub struct TradeData {
    pub cargo: ShipCargo,
    pub transaction: MarketTransaction,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketTransaction {
    #[serde(rename = "tradeSymbol")]
    pub trade_symbol: String,
    pub units: u32,
    #[serde(rename = "totalPrice", default)]
    pub total_price: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferCargoData {
    /// Sender's cargo after the transfer
    pub cargo: ShipCargo,
    /// Receiver's cargo, returned by newer API revisions
    #[serde(rename = "targetCargo", default)]
    pub target_cargo: Option<ShipCargo>,
}

/// One completed producer -> consumer handoff. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    pub producer: String,
    pub consumer: String,
    pub good: String,
    pub units: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Market {
    pub symbol: String,
    #[serde(rename = "tradeGoods", default)]
    pub trade_goods: Vec<MarketTradeGood>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketTradeGood {
    pub symbol: String,
    #[serde(rename = "tradeVolume", default)]
    pub trade_volume: u32,
    #[serde(rename = "purchasePrice", default)]
    pub purchase_price: i64,
    #[serde(rename = "sellPrice", default)]
    pub sell_price: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Shipyard {
    pub symbol: String,
    #[serde(rename = "shipTypes", default)]
    pub ship_types: Vec<ShipyardShipType>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShipyardShipType {
    #[serde(rename = "type")]
    pub ship_type: String,
}

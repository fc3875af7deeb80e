use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ledger::AssetBook;

/// Trade side (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }
}

impl FromStr for TradeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(TradeType::Buy),
            "SELL" | "S" => Ok(TradeType::Sell),
            _ => Err(()),
        }
    }
}

/// An executed trade. Immutable once stored in the wallet's log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub ticker: String,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    /// Epoch milliseconds
    pub created_timestamp: i64,
    /// Commission as a percentage of notional (0.1 means 0.1%)
    #[serde(default)]
    pub fee: Decimal,
    /// Realized profit, only ever set on sells by the profit attributor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
}

impl Trade {
    /// Quantity times price; `None` when it does not fit in a Decimal
    pub fn notional(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.created_timestamp)
    }
}

/// A trade request; unset fields are resolved when the trade is applied.
///
/// Resolution: timestamp defaults to the wallet clock, fee to 0, id to a
/// random UUID, and price to the ticker's last known price (failing when
/// there is none).
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOptions {
    pub ticker: String,
    pub quantity: Decimal,
    pub trade_type: TradeType,
    pub price: Option<Decimal>,
    pub created_timestamp: Option<i64>,
    pub fee: Option<Decimal>,
    pub id: Option<String>,
}

impl TradeOptions {
    pub fn new(ticker: impl Into<String>, quantity: Decimal, trade_type: TradeType) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
            trade_type,
            price: None,
            created_timestamp: None,
            fee: None,
            id: None,
        }
    }

    pub fn buy(ticker: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(ticker, quantity, TradeType::Buy)
    }

    pub fn sell(ticker: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(ticker, quantity, TradeType::Sell)
    }

    pub fn at_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.created_timestamp = Some(when.timestamp_millis());
        self
    }

    pub fn at_millis(mut self, millis: i64) -> Self {
        self.created_timestamp = Some(millis);
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<Trade> for TradeOptions {
    fn from(trade: Trade) -> Self {
        Self {
            ticker: trade.ticker,
            quantity: trade.quantity,
            trade_type: trade.trade_type,
            price: Some(trade.price),
            created_timestamp: Some(trade.created_timestamp),
            fee: Some(trade.fee),
            id: Some(trade.id),
        }
    }
}

/// Valuation of the wallet as of its last mutation on a calendar day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySnapshot {
    /// Exact time of the mutation, not midnight
    pub date: DateTime<Utc>,
    pub value: Decimal,
    pub prices: AssetBook,
}

/// One slice of the allocation chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DonutAssetInfo {
    pub ticker: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

/// A trade as shown in the order history, with its realized profit
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderMovementInfo {
    pub date: DateTime<Utc>,
    pub fee: Decimal,
    pub notional: Decimal,
    pub order_id: String,
    pub profit: Option<Decimal>,
    pub side: TradeType,
    pub ticker: String,
    pub price_at: Decimal,
    pub quantity: Decimal,
}

/// Epoch milliseconds as a UTC instant, if chrono can represent it
pub(crate) fn checked_millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    checked_millis_to_datetime(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

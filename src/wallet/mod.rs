//! The wallet: ledger state, price feed and valuation queries.
//!
//! Cash is modeled as a holding of the configured base-currency ticker with a
//! fixed price of 1, so the balance takes part in every valuation like any
//! other asset.

mod trades;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::ledger::AssetBook;
use crate::models::{DaySnapshot, DonutAssetInfo, Trade};

pub(crate) use trades::{add_fee, fee_amount, remove_fee};

#[derive(Debug, Clone)]
pub struct WalletSimulator {
    pub(crate) config: WalletConfig,
    pub(crate) holdings: AssetBook,
    pub(crate) prices: AssetBook,
    /// Cumulative cost-basis numerator per ticker, fees excluded
    pub(crate) cost_basis: AssetBook,
    pub(crate) trades: Vec<Trade>,
    pub(crate) day_snapshots: BTreeMap<NaiveDate, DaySnapshot>,
    pub(crate) balance_at_wallet_creation: Decimal,
    pub(crate) creation_at: DateTime<Utc>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl WalletSimulator {
    pub fn new(balance: Decimal) -> Self {
        Self::with_config(balance, WalletConfig::default())
    }

    pub fn with_config(balance: Decimal, config: WalletConfig) -> Self {
        Self::with_clock(balance, config, Arc::new(SystemClock))
    }

    /// Create a wallet seeded with `balance` of the base currency.
    pub fn with_clock(balance: Decimal, config: WalletConfig, clock: Arc<dyn Clock>) -> Self {
        let mut holdings = AssetBook::new();
        holdings.insert(&config.base_currency, balance);
        let mut prices = AssetBook::new();
        prices.insert(&config.base_currency, Decimal::ONE);

        Self {
            holdings,
            prices,
            cost_basis: AssetBook::new(),
            trades: Vec::new(),
            day_snapshots: BTreeMap::new(),
            balance_at_wallet_creation: balance,
            creation_at: clock.now(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn base_currency(&self) -> &str {
        &self.config.base_currency
    }

    pub(crate) fn is_base_currency(&self, ticker: &str) -> bool {
        ticker == self.config.base_currency
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn creation_at(&self) -> DateTime<Utc> {
        self.creation_at
    }

    pub fn balance_at_wallet_creation(&self) -> Decimal {
        self.balance_at_wallet_creation
    }

    pub fn allow_negative_balance(&self) -> bool {
        self.config.allow_negative_balance
    }

    pub fn set_allow_negative_balance(&mut self, allow: bool) {
        self.config.allow_negative_balance = allow;
    }

    pub fn allow_negative_held(&self) -> bool {
        self.config.allow_negative_held
    }

    pub fn set_allow_negative_held(&mut self, allow: bool) {
        self.config.allow_negative_held = allow;
    }

    /// All trades applied so far, in application order
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn holdings(&self) -> &AssetBook {
        &self.holdings
    }

    pub fn prices(&self) -> &AssetBook {
        &self.prices
    }

    pub fn cost_basis(&self) -> &AssetBook {
        &self.cost_basis
    }

    pub fn day_snapshots(&self) -> &BTreeMap<NaiveDate, DaySnapshot> {
        &self.day_snapshots
    }

    /// Base-currency holding
    pub fn get_balance(&self) -> Decimal {
        self.get_position_quantity(&self.config.base_currency)
    }

    pub fn get_price(&self, ticker: &str) -> Result<Decimal> {
        self.prices
            .get(ticker)
            .ok_or_else(|| WalletError::UnknownPrice(ticker.to_string()))
    }

    pub fn is_price_defined(&self, ticker: &str) -> bool {
        self.prices.contains(ticker)
    }

    /// Set the last observed price of `ticker`.
    ///
    /// Writes a day snapshot at `timestamp` (or now) only when the price is
    /// new or actually changed. The base currency is pinned at 1 and ignored.
    pub fn update_price(
        &mut self,
        ticker: &str,
        price: Decimal,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<&mut Self> {
        if self.is_base_currency(ticker) {
            if price != Decimal::ONE {
                debug!("Ignoring price {} for base currency {}", price, ticker);
            }
            return Ok(self);
        }
        if self.prices.get(ticker) == Some(price) {
            return Ok(self);
        }

        let at = timestamp.unwrap_or_else(|| self.clock.now());
        let saved = self.prices.clone();
        self.prices.insert(ticker, price);
        if let Err(err) = self.record_snapshot(at) {
            self.prices = saved;
            return Err(err);
        }
        debug!("Price of {} set to {} at {}", ticker, price, at);
        Ok(self)
    }

    pub fn get_position_quantity(&self, ticker: &str) -> Decimal {
        self.holdings.get(ticker).unwrap_or(Decimal::ZERO)
    }

    /// Quantity times last price; fails when the price was never observed.
    pub fn get_position_value(&self, ticker: &str) -> Result<Decimal> {
        let quantity = self.get_position_quantity(ticker);
        let price = self.get_price(ticker)?;
        quantity
            .checked_mul(price)
            .ok_or_else(|| WalletError::Overflow(format!("value of {}", ticker)))
    }

    pub fn get_position_average_cost(&self, ticker: &str) -> Decimal {
        let quantity = self.get_position_quantity(ticker);
        if quantity.is_zero() {
            return Decimal::ZERO;
        }
        let basis = self.cost_basis.get(ticker).unwrap_or(Decimal::ZERO);
        // Saturates for dust positions carrying a large basis
        basis.checked_div(quantity).unwrap_or(Decimal::MAX)
    }

    /// Price at which the whole position breaks even
    pub fn get_estimated_liquidation_price(&self, ticker: &str) -> Decimal {
        if self.get_position_quantity(ticker).is_zero() {
            return Decimal::ZERO;
        }
        self.get_position_average_cost(ticker)
    }

    pub fn get_estimated_unrealized_profit_loss(&self, ticker: &str) -> Result<Decimal> {
        let quantity = self.get_position_quantity(ticker);
        if quantity.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let price = self.get_price(ticker)?;
        price
            .checked_sub(self.get_position_average_cost(ticker))
            .and_then(|gain| gain.checked_mul(quantity))
            .ok_or_else(|| WalletError::Overflow(format!("unrealized P&L of {}", ticker)))
    }

    /// Sum of every holding's value, cash included
    pub fn get_total_value(&self) -> Result<Decimal> {
        self.holdings
            .tickers()
            .try_fold(Decimal::ZERO, |total, ticker| {
                total
                    .checked_add(self.get_position_value(ticker)?)
                    .ok_or_else(|| WalletError::Overflow("total value".to_string()))
            })
    }

    /// Every ticker ever held, base currency included, in first-held order.
    /// Fully sold assets stay listed with quantity 0.
    pub fn get_all_owned_assets(&self) -> Vec<String> {
        self.holdings.tickers().map(str::to_string).collect()
    }

    /// Value and share of total for each holding, in first-held order
    pub fn get_donut_asset_information(&self) -> Result<Vec<DonutAssetInfo>> {
        let total = self.get_total_value()?;
        self.holdings
            .tickers()
            .map(|ticker| {
                let value = self.get_position_value(ticker)?;
                let percentage = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    value
                        .checked_div(total)
                        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
                        .ok_or_else(|| WalletError::Overflow(format!("share of {}", ticker)))?
                };
                Ok(DonutAssetInfo {
                    ticker: ticker.to_string(),
                    value,
                    percentage,
                })
            })
            .collect()
    }
}

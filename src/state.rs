//! Snapshot export and trusted restore.
//!
//! The exported object carries the wallet's internal state verbatim. Restoring
//! it writes the fields straight back without re-validating anything; use
//! [`WalletSimulator::replay_trades`] to rebuild from an untrusted trade log
//! instead.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::WalletConfig;
use crate::error::Result;
use crate::ledger::AssetBook;
use crate::models::{DaySnapshot, Trade};
use crate::wallet::WalletSimulator;

/// Serialized wallet. Key names are part of the persisted format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    #[serde(rename = "_trades")]
    pub trades: Vec<Trade>,
    pub balance_at_wallet_creation: Decimal,
    pub allow_negative_balance: bool,
    pub allow_negative_held: bool,
    pub holdings: AssetBook,
    pub prices: AssetBook,
    pub cost_basis: AssetBook,
    pub day_snapshots: BTreeMap<NaiveDate, DaySnapshot>,
    #[serde(rename = "_creationAt")]
    pub creation_at: DateTime<Utc>,
}

/// Fields to write onto a freshly constructed wallet.
///
/// Each field is applied when present, whatever its value: a restored
/// `false` flag or zero balance is kept, not skipped.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletOverrides {
    #[serde(rename = "_trades")]
    pub trades: Option<Vec<Trade>>,
    pub balance_at_wallet_creation: Option<Decimal>,
    pub allow_negative_balance: Option<bool>,
    pub allow_negative_held: Option<bool>,
    pub holdings: Option<AssetBook>,
    pub prices: Option<AssetBook>,
    pub cost_basis: Option<AssetBook>,
    pub day_snapshots: Option<BTreeMap<NaiveDate, DaySnapshot>>,
    #[serde(rename = "_creationAt", alias = "creationDate")]
    pub creation_at: Option<DateTime<Utc>>,
}

impl From<WalletState> for WalletOverrides {
    fn from(state: WalletState) -> Self {
        Self {
            trades: Some(state.trades),
            balance_at_wallet_creation: Some(state.balance_at_wallet_creation),
            allow_negative_balance: Some(state.allow_negative_balance),
            allow_negative_held: Some(state.allow_negative_held),
            holdings: Some(state.holdings),
            prices: Some(state.prices),
            cost_basis: Some(state.cost_basis),
            day_snapshots: Some(state.day_snapshots),
            creation_at: Some(state.creation_at),
        }
    }
}

impl WalletSimulator {
    /// Construct a wallet, then overwrite every field present in `overrides`.
    pub fn with_overrides(
        balance: Decimal,
        config: WalletConfig,
        clock: Arc<dyn Clock>,
        overrides: WalletOverrides,
    ) -> Self {
        let mut wallet = WalletSimulator::with_clock(balance, config, clock);

        if let Some(trades) = overrides.trades {
            wallet.trades = trades;
        }
        if let Some(seed) = overrides.balance_at_wallet_creation {
            wallet.balance_at_wallet_creation = seed;
        }
        if let Some(allow) = overrides.allow_negative_balance {
            wallet.config.allow_negative_balance = allow;
        }
        if let Some(allow) = overrides.allow_negative_held {
            wallet.config.allow_negative_held = allow;
        }
        if let Some(holdings) = overrides.holdings {
            wallet.holdings = holdings;
        }
        if let Some(prices) = overrides.prices {
            wallet.prices = prices;
        }
        if let Some(cost_basis) = overrides.cost_basis {
            wallet.cost_basis = cost_basis;
        }
        if let Some(day_snapshots) = overrides.day_snapshots {
            wallet.day_snapshots = day_snapshots;
        }
        if let Some(creation_at) = overrides.creation_at {
            wallet.creation_at = creation_at;
        }

        wallet
    }

    pub fn export_state(&self) -> WalletState {
        WalletState {
            trades: self.trades.clone(),
            balance_at_wallet_creation: self.balance_at_wallet_creation,
            allow_negative_balance: self.config.allow_negative_balance,
            allow_negative_held: self.config.allow_negative_held,
            holdings: self.holdings.clone(),
            prices: self.prices.clone(),
            cost_basis: self.cost_basis.clone(),
            day_snapshots: self.day_snapshots.clone(),
            creation_at: self.creation_at,
        }
    }

    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_state())?)
    }

    /// Restore a wallet exported with [`export_to_json`](Self::export_to_json),
    /// using the default config and the system clock.
    ///
    /// The export does not name the base currency. A wallet always holds it
    /// first, so it is read back from the first restored holding.
    pub fn import_from_json_str(json: &str) -> Result<Self> {
        let overrides: WalletOverrides = serde_json::from_str(json)?;
        let mut config = WalletConfig::default();
        if let Some((ticker, _)) = overrides.holdings.as_ref().and_then(|h| h.iter().next()) {
            config.base_currency = ticker.to_string();
        }
        Ok(Self::restore(overrides, config, Arc::new(SystemClock)))
    }

    /// Restore with an explicit config; its base currency is taken as is.
    pub fn import_with_config(json: &str, config: WalletConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let overrides: WalletOverrides = serde_json::from_str(json)?;
        Ok(Self::restore(overrides, config, clock))
    }

    fn restore(overrides: WalletOverrides, config: WalletConfig, clock: Arc<dyn Clock>) -> Self {
        debug!(
            "Restoring {} wallet with {} trades",
            config.base_currency,
            overrides.trades.as_ref().map_or(0, Vec::len)
        );
        Self::with_overrides(Decimal::ZERO, config, clock, overrides)
    }

    /// Deep copy through the export format
    pub fn clone_via_json(&self) -> Result<Self> {
        let json = self.export_to_json()?;
        Self::import_with_config(&json, self.config.clone(), Arc::clone(&self.clock))
    }
}

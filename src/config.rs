//! Wallet policy configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_CURRENCY: &str = "USDT";
pub const DEFAULT_PROFIT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Ticker of the unit of account. Held like any other asset, priced at 1.
    pub base_currency: String,
    /// Let buys drive the base-currency balance below zero.
    pub allow_negative_balance: bool,
    /// Let sells exceed the held quantity (holdings still floor at zero).
    pub allow_negative_held: bool,
    /// How many preceding buys a sell's realized profit is measured against.
    pub profit_window: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            allow_negative_balance: false,
            allow_negative_held: false,
            profit_window: DEFAULT_PROFIT_WINDOW,
        }
    }
}

impl WalletConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: WalletConfig =
            toml::from_str(raw).context("failed to parse wallet config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read wallet config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.base_currency.trim().is_empty() {
            anyhow::bail!("base_currency must not be empty");
        }
        if self.profit_window == 0 {
            anyhow::bail!("profit_window must be at least 1");
        }
        Ok(())
    }
}

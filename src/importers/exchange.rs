use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::ledger::AssetBook;
use crate::models::{Trade, TradeType};
use crate::wallet::{add_fee, remove_fee, WalletSimulator};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeFee {
    pub cost: Decimal,
    pub currency: String,
}

/// A fill as reported by an exchange, e.g. `ETH/USDT` bought at 1581.86
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeTrade {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub symbol: String,
    pub id: String,
    #[serde(default)]
    pub order: Option<String>,
    pub side: ExchangeSide,
    pub price: Decimal,
    pub amount: Decimal,
    /// Notional in the quote currency
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<ExchangeFee>,
}

impl ExchangeTrade {
    /// Traded asset: `ETH` for `ETH/USDT`
    pub fn base_asset(&self) -> &str {
        self.symbol.split('/').next().unwrap_or(&self.symbol)
    }

    /// Pricing currency: `USDT` for `ETH/USDT`
    pub fn quote_asset(&self) -> Option<&str> {
        self.symbol.split('/').nth(1)
    }

    /// Fee as a percentage of notional. Only fees charged in the quote
    /// currency can be expressed that way; anything else counts as zero.
    pub fn fee_percentage(&self) -> Decimal {
        let notional = self.amount.checked_mul(self.price).unwrap_or(Decimal::ZERO);
        match &self.fee {
            Some(fee)
                if Some(fee.currency.as_str()) == self.quote_asset() && !notional.is_zero() =>
            {
                fee.cost
                    .checked_div(notional)
                    .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
                    .unwrap_or_else(|| {
                        debug!("Fee {} on trade {} is out of range", fee.cost, self.id);
                        Decimal::ZERO
                    })
            }
            Some(fee) if !fee.cost.is_zero() => {
                debug!(
                    "Ignoring {} {} fee on trade {} ({})",
                    fee.cost, fee.currency, self.id, self.symbol
                );
                Decimal::ZERO
            }
            _ => Decimal::ZERO,
        }
    }

    pub fn to_trade(&self) -> Trade {
        Trade {
            id: self.id.clone(),
            ticker: self.base_asset().to_string(),
            price: self.price,
            quantity: self.amount,
            trade_type: match self.side {
                ExchangeSide::Buy => TradeType::Buy,
                ExchangeSide::Sell => TradeType::Sell,
            },
            created_timestamp: self.timestamp,
            fee: self.fee_percentage(),
            profit: None,
        }
    }
}

/// A ticker whose replayed quantity disagrees with what the exchange reports
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingMismatch {
    pub ticker: String,
    pub reported: Decimal,
    pub replayed: Decimal,
}

#[derive(Debug)]
pub struct ExchangeReplay {
    pub wallet: WalletSimulator,
    pub mismatches: Vec<HoldingMismatch>,
}

/// Base-currency change a trade causes
fn cash_effect(trade: &Trade) -> Option<Decimal> {
    let notional = trade.notional()?;
    match trade.trade_type {
        TradeType::Buy => add_fee(notional, trade.fee).map(|cost| -cost),
        TradeType::Sell => remove_fee(notional, trade.fee),
    }
}

/// Seed capital so the replay ends on `reported_cash`, raised when needed
/// so the balance never dips below zero along the way.
fn derive_seed(trades: &[Trade], reported_cash: Decimal) -> Result<Decimal> {
    let overflow = || WalletError::Overflow("exchange cash flow".to_string());

    let mut flow = Decimal::ZERO;
    let mut lowest = Decimal::ZERO;
    for trade in trades {
        flow = cash_effect(trade)
            .and_then(|effect| flow.checked_add(effect))
            .ok_or_else(overflow)?;
        lowest = lowest.min(flow);
    }

    let matching = reported_cash.checked_sub(flow).ok_or_else(overflow)?;
    let seed = matching.max(-lowest).max(Decimal::ZERO);
    if seed != matching {
        warn!(
            "Seed raised from {} to {} to keep the replayed balance non-negative",
            matching, seed
        );
    }
    Ok(seed)
}

/// Rebuild a wallet from an exchange's trade history and current snapshot.
///
/// `prices` are the current quotes and `holdings` the currently reported
/// quantities (base currency included). Assets held before the history starts
/// are tolerated: the wallet allows overselling.
pub fn replay_exchange_history(
    prices: &AssetBook,
    holdings: &AssetBook,
    mut history: Vec<ExchangeTrade>,
    config: WalletConfig,
    clock: Arc<dyn Clock>,
) -> Result<ExchangeReplay> {
    history.sort_by_key(|t| t.timestamp);

    let trades: Vec<Trade> = history
        .iter()
        .map(ExchangeTrade::to_trade)
        .filter(|trade| {
            let usable =
                trade.quantity > Decimal::ZERO && trade.ticker != config.base_currency;
            if !usable {
                warn!(
                    "Skipping exchange trade {} ({} {} {})",
                    trade.id,
                    trade.trade_type.as_str(),
                    trade.quantity,
                    trade.ticker
                );
            }
            usable
        })
        .collect();

    let reported_cash = holdings.get(&config.base_currency).unwrap_or(Decimal::ZERO);
    let seed = derive_seed(&trades, reported_cash)?;

    let config = WalletConfig {
        allow_negative_held: true,
        ..config
    };
    let mut wallet = WalletSimulator::with_clock(seed, config, clock);
    wallet.replay_trades(trades)?;

    for (ticker, price) in prices.iter() {
        wallet.update_price(ticker, price, None)?;
    }

    let mismatches: Vec<HoldingMismatch> = holdings
        .iter()
        .filter_map(|(ticker, reported)| {
            let replayed = wallet.get_position_quantity(ticker);
            (replayed != reported).then(|| HoldingMismatch {
                ticker: ticker.to_string(),
                reported,
                replayed,
            })
        })
        .collect();

    for mismatch in &mismatches {
        warn!(
            "{}: exchange reports {} but history replays to {}",
            mismatch.ticker, mismatch.reported, mismatch.replayed
        );
    }

    info!(
        "Replayed {} exchange trades from seed {}: {} holdings, {} mismatches",
        wallet.trades().len(),
        seed,
        wallet.holdings().len(),
        mismatches.len()
    );

    Ok(ExchangeReplay { wallet, mismatches })
}

impl WalletSimulator {
    /// Build a wallet from an exchange's trade history; see
    /// [`replay_exchange_history`].
    pub fn from_exchange_history(
        prices: &AssetBook,
        holdings: &AssetBook,
        history: Vec<ExchangeTrade>,
        config: WalletConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<WalletSimulator> {
        replay_exchange_history(prices, holdings, history, config, clock).map(|r| r.wallet)
    }
}

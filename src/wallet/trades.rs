use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use super::WalletSimulator;
use crate::error::{Result, WalletError};
use crate::models::{checked_millis_to_datetime, Trade, TradeOptions, TradeType};

/// `amount` plus a fee given as a percentage of it
pub(crate) fn add_fee(amount: Decimal, fee_pct: Decimal) -> Option<Decimal> {
    amount.checked_add(fee_amount(amount, fee_pct)?)
}

/// `amount` minus a fee given as a percentage of it
pub(crate) fn remove_fee(amount: Decimal, fee_pct: Decimal) -> Option<Decimal> {
    amount.checked_sub(fee_amount(amount, fee_pct)?)
}

pub(crate) fn fee_amount(amount: Decimal, fee_pct: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(fee_pct)?
        .checked_div(Decimal::ONE_HUNDRED)
}

fn too_large(trade: &Trade) -> WalletError {
    WalletError::InvalidTrade(format!(
        "{} {} {} @ {} is too large to account for",
        trade.trade_type.as_str(),
        trade.quantity,
        trade.ticker,
        trade.price
    ))
}

impl WalletSimulator {
    /// Resolve and apply a single buy or sell.
    ///
    /// Either the whole trade applies (balance, holdings, cost basis, price,
    /// trade log and the day snapshot of its timestamp) or nothing changes.
    pub fn add_trade(&mut self, options: TradeOptions) -> Result<&mut Self> {
        let trade = self.resolve_trade(options)?;
        self.apply_trade(trade)?;
        Ok(self)
    }

    /// Rebuild the wallet from its seed capital by re-applying `trades`
    /// through [`add_trade`](Self::add_trade).
    ///
    /// Holdings, cost basis, balance, the trade log and day snapshots are
    /// recomputed from scratch. On error the wallet keeps its previous state.
    pub fn replay_trades(&mut self, trades: Vec<Trade>) -> Result<&mut Self> {
        let mut rebuilt = WalletSimulator::with_clock(
            self.balance_at_wallet_creation,
            self.config.clone(),
            Arc::clone(&self.clock),
        );
        rebuilt.creation_at = self.creation_at;

        let count = trades.len();
        for trade in trades {
            rebuilt.add_trade(TradeOptions::from(trade))?;
        }

        let total_value = rebuilt.get_total_value()?;
        debug!(
            "Replayed {} trades: balance {}, total value {}",
            count,
            rebuilt.get_balance(),
            total_value
        );
        *self = rebuilt;
        Ok(self)
    }

    fn resolve_trade(&self, options: TradeOptions) -> Result<Trade> {
        if self.is_base_currency(&options.ticker) {
            return Err(WalletError::InvalidTrade(format!(
                "cannot trade the base currency {}",
                options.ticker
            )));
        }
        if options.quantity <= Decimal::ZERO {
            return Err(WalletError::InvalidTrade(format!(
                "quantity must be positive, got {} {}",
                options.quantity, options.ticker
            )));
        }

        let price = match options.price {
            Some(price) => price,
            None => self
                .prices
                .get(&options.ticker)
                .ok_or_else(|| WalletError::UnresolvablePrice(options.ticker.clone()))?,
        };
        if price < Decimal::ZERO {
            return Err(WalletError::InvalidTrade(format!(
                "price must not be negative, got {} for {}",
                price, options.ticker
            )));
        }

        let fee = options.fee.unwrap_or(Decimal::ZERO);
        if fee < Decimal::ZERO {
            return Err(WalletError::InvalidTrade(format!(
                "fee must not be negative, got {}% on {}",
                fee, options.ticker
            )));
        }

        let created_timestamp = options
            .created_timestamp
            .unwrap_or_else(|| self.clock.now().timestamp_millis());
        if checked_millis_to_datetime(created_timestamp).is_none() {
            return Err(WalletError::InvalidTrade(format!(
                "timestamp {} is out of range",
                created_timestamp
            )));
        }

        Ok(Trade {
            id: options
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            ticker: options.ticker,
            price,
            quantity: options.quantity,
            trade_type: options.trade_type,
            created_timestamp,
            fee,
            profit: None,
        })
    }

    fn apply_trade(&mut self, trade: Trade) -> Result<()> {
        // Restored if the trade or the snapshot that values it fails
        let saved = (
            self.holdings.clone(),
            self.prices.clone(),
            self.cost_basis.clone(),
        );

        let applied = match trade.trade_type {
            TradeType::Buy => self.buy(&trade),
            TradeType::Sell => self.sell(&trade),
        }
        .and_then(|()| self.record_snapshot(trade.created_at()));

        if let Err(err) = applied {
            (self.holdings, self.prices, self.cost_basis) = saved;
            return Err(err);
        }

        debug!(
            "{} {} {} @ {} (fee {}%), balance now {}",
            trade.trade_type.as_str(),
            trade.quantity,
            trade.ticker,
            trade.price,
            trade.fee,
            self.get_balance()
        );
        self.trades.push(trade);
        Ok(())
    }

    fn buy(&mut self, trade: &Trade) -> Result<()> {
        let gross = trade.notional().ok_or_else(|| too_large(trade))?;
        let gross_with_fee = add_fee(gross, trade.fee).ok_or_else(|| too_large(trade))?;
        let balance = self.get_balance();

        if !self.config.allow_negative_balance && balance < gross_with_fee {
            return Err(WalletError::InsufficientFunds {
                ticker: trade.ticker.clone(),
                quantity: trade.quantity,
                price: trade.price,
                balance,
            });
        }

        let held = self.get_position_quantity(&trade.ticker);
        let basis = self.cost_basis.get(&trade.ticker).unwrap_or(Decimal::ZERO);
        let new_balance = balance
            .checked_sub(gross_with_fee)
            .ok_or_else(|| too_large(trade))?;
        let new_held = held
            .checked_add(trade.quantity)
            .ok_or_else(|| too_large(trade))?;
        let new_basis = basis.checked_add(gross).ok_or_else(|| too_large(trade))?;

        self.prices.insert(&trade.ticker, trade.price);
        self.holdings.insert(&self.config.base_currency, new_balance);
        self.holdings.insert(&trade.ticker, new_held);
        self.cost_basis.insert(&trade.ticker, new_basis);
        Ok(())
    }

    fn sell(&mut self, trade: &Trade) -> Result<()> {
        let owned = self.get_position_quantity(&trade.ticker);

        if owned < trade.quantity {
            if !self.config.allow_negative_held {
                return Err(WalletError::InsufficientHoldings {
                    ticker: trade.ticker.clone(),
                    quantity: trade.quantity,
                    owned,
                });
            }
            warn!(
                "Selling {} {} with only {} held; position floored at zero",
                trade.quantity, trade.ticker, owned
            );
        }

        let gross = trade.notional().ok_or_else(|| too_large(trade))?;
        let net = remove_fee(gross, trade.fee).ok_or_else(|| too_large(trade))?;
        let new_balance = self
            .get_balance()
            .checked_add(net)
            .ok_or_else(|| too_large(trade))?;
        let remaining = (owned - trade.quantity).max(Decimal::ZERO);

        // Average cost of the units being sold, measured before the sale
        let new_basis = if remaining.is_zero() {
            Decimal::ZERO
        } else {
            let sold = trade.quantity.min(owned);
            let basis = self.cost_basis.get(&trade.ticker).unwrap_or(Decimal::ZERO);
            let released = self
                .get_position_average_cost(&trade.ticker)
                .checked_mul(sold)
                .ok_or_else(|| too_large(trade))?;
            (basis - released).max(Decimal::ZERO)
        };

        self.prices.insert(&trade.ticker, trade.price);
        self.holdings.insert(&self.config.base_currency, new_balance);
        self.holdings.insert(&trade.ticker, remaining);
        self.cost_basis.insert(&trade.ticker, new_basis);
        Ok(())
    }
}

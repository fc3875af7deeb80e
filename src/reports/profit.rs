//! Realized profit per sell order.
//!
//! Each sell is measured against the weighted average price of the buys of
//! the same ticker that precede it, looking back at most `window` buys and
//! never past the previous sell of that ticker. This is a reporting
//! heuristic, independent of the wallet's running cost basis.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{OrderMovementInfo, Trade, TradeType};
use crate::wallet::{fee_amount, WalletSimulator};

/// Realized profit for every trade of a chronological log, by position.
/// Buys get `None`, as do sells whose figures overflow. A `window` of 0
/// counts as 1.
pub fn calculate_profits(trades: &[Trade], window: usize) -> Vec<Option<Decimal>> {
    let window = window.max(1);
    trades
        .iter()
        .enumerate()
        .map(|(idx, trade)| match trade.trade_type {
            TradeType::Buy => None,
            TradeType::Sell => {
                let profit = weighted_average_buy_price(&trades[..idx], &trade.ticker, window)
                    .and_then(|average| realized_profit(trade, average));
                if profit.is_none() {
                    warn!("Realized profit of order {} overflows", trade.id);
                }
                profit
            }
        })
        .collect()
}

/// Copy of `trades` with `profit` filled in on sells
pub fn with_profits(trades: &[Trade], window: usize) -> Vec<Trade> {
    trades
        .iter()
        .zip(calculate_profits(trades, window))
        .map(|(trade, profit)| Trade {
            profit,
            ..trade.clone()
        })
        .collect()
}

/// Weighted average price of the most recent buys of `ticker` in `earlier`,
/// scanning backwards until `window` buys are found or a sell of `ticker`
/// is reached. Zero when there are none.
fn weighted_average_buy_price(earlier: &[Trade], ticker: &str, window: usize) -> Option<Decimal> {
    let mut volume = Decimal::ZERO;
    let mut cost = Decimal::ZERO;
    let mut found = 0;

    for trade in earlier.iter().rev().filter(|t| t.ticker == ticker) {
        if trade.trade_type == TradeType::Sell {
            break;
        }
        volume = volume.checked_add(trade.quantity)?;
        cost = cost.checked_add(trade.notional()?)?;
        found += 1;
        if found >= window {
            break;
        }
    }

    if volume.is_zero() {
        Some(Decimal::ZERO)
    } else {
        cost.checked_div(volume)
    }
}

fn realized_profit(sell: &Trade, average_buy_price: Decimal) -> Option<Decimal> {
    let notional = sell.notional()?;
    let cost = average_buy_price.checked_mul(sell.quantity)?;
    notional
        .checked_sub(cost)?
        .checked_sub(fee_amount(notional, sell.fee)?)
}

impl WalletSimulator {
    /// The trade log (or `orders`, if given) as order-history rows, with
    /// realized profit on sells.
    pub fn pl_made_by_orders(&self, orders: Option<&[Trade]>) -> Vec<OrderMovementInfo> {
        let orders = orders.unwrap_or(self.trades.as_slice());
        let profits = calculate_profits(orders, self.config.profit_window);

        orders
            .iter()
            .zip(profits)
            .map(|(trade, profit)| OrderMovementInfo {
                date: trade.created_at(),
                fee: trade.fee,
                // Only reachable for orders passed in that never went through add_trade
                notional: trade.notional().unwrap_or(Decimal::MAX),
                order_id: trade.id.clone(),
                profit,
                side: trade.trade_type,
                ticker: trade.ticker.clone(),
                price_at: trade.price,
                quantity: trade.quantity,
            })
            .collect()
    }

    /// The trade log with `profit` populated on sells
    pub fn trades_with_profits(&self) -> Vec<Trade> {
        with_profits(&self.trades, self.config.profit_window)
    }
}

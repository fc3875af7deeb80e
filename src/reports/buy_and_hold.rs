use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::error::Result;
use crate::models::{DaySnapshot, TradeOptions};
use crate::snapshots::{days_before, fill_gaps_until};
use crate::wallet::WalletSimulator;

impl WalletSimulator {
    /// Valuation curve of a "buy everything equally and hold" benchmark over
    /// the same window as [`get_trend_balance_snapshots`](Self::get_trend_balance_snapshots).
    ///
    /// The benchmark starts from this wallet's seed capital split into
    /// `N + 1` equal slices, `N` being the assets this wallet has ever held;
    /// the extra slice stays in cash. Each asset is bought once, with one
    /// slice, on the first stored day its price shows up, and every position
    /// is then marked to each day's prices.
    pub fn get_trend_balance_snapshots_buy_and_hold(
        &self,
        back_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DaySnapshot>> {
        let today = days_before(now, 1);
        let past = days_before(now, i64::from(back_days));

        let assets_to_buy: Vec<String> = self
            .get_all_owned_assets()
            .into_iter()
            .filter(|ticker| !self.is_base_currency(ticker))
            .collect();

        let seed = self.balance_at_wallet_creation;
        let slice = seed / Decimal::from(assets_to_buy.len() + 1);

        let config = WalletConfig {
            base_currency: self.config.base_currency.clone(),
            ..WalletConfig::default()
        };
        let mut benchmark = WalletSimulator::with_clock(seed, config, Arc::clone(&self.clock));
        let mut bought: HashSet<String> = HashSet::new();
        let mut series = Vec::new();

        for snapshot in self.sorted_day_snapshots_on_range(past, today) {
            for (ticker, price) in snapshot.prices.iter() {
                let pending = assets_to_buy.iter().any(|asset| asset == ticker)
                    && !bought.contains(ticker);
                if !pending {
                    continue;
                }
                if price <= Decimal::ZERO {
                    warn!(
                        "Buy-and-hold cannot buy {} at price {} on {}",
                        ticker, price, snapshot.date
                    );
                    continue;
                }

                let quantity = match slice.checked_div(price) {
                    Some(quantity) if quantity > Decimal::ZERO => quantity,
                    _ => {
                        warn!(
                            "Buy-and-hold cannot size a {} position at price {} on {}",
                            ticker, price, snapshot.date
                        );
                        continue;
                    }
                };
                benchmark.add_trade(
                    TradeOptions::buy(ticker, quantity)
                        .at_price(price)
                        .at(snapshot.date),
                )?;
                bought.insert(ticker.to_string());
            }

            for (ticker, price) in snapshot.prices.iter() {
                benchmark.update_price(ticker, price, Some(snapshot.date))?;
            }

            series.push(DaySnapshot {
                date: snapshot.date,
                value: benchmark.get_total_value()?,
                prices: snapshot.prices.clone(),
            });
        }

        debug!(
            "Buy-and-hold bought {} of {} assets over {} days",
            bought.len(),
            assets_to_buy.len(),
            series.len()
        );
        Ok(fill_gaps_until(series, self.terminal_point(now)))
    }
}

//! Day snapshots and the trend reconstructor.
//!
//! Every successful mutation overwrites the snapshot of its UTC calendar day,
//! so a day always reflects its last mutation. Trend queries read the stored
//! days in a window and forward-fill the days nothing happened on.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::trace;

use crate::error::Result;
use crate::models::DaySnapshot;
use crate::wallet::WalletSimulator;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// UTC calendar day a timestamp belongs to
pub fn day_key(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Instant `days` whole days before `at`, clamped to the earliest
/// representable instant.
pub fn days_before(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|span| at.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whole days between two instants, rounded half up
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = (to - from).num_milliseconds();
    millis.saturating_add(MS_PER_DAY / 2).div_euclid(MS_PER_DAY)
}

/// Insert a copy of the earlier point for every day skipped between two
/// consecutive points. Values are carried forward, never interpolated.
pub fn fill_gaps(series: Vec<DaySnapshot>) -> Vec<DaySnapshot> {
    let mut filled = Vec::with_capacity(series.len());
    let mut points = series.into_iter().peekable();

    while let Some(current) = points.next() {
        let gap = points
            .peek()
            .map(|next| days_between(current.date, next.date))
            .unwrap_or(0);

        let carried: Vec<DaySnapshot> = (1..gap)
            .filter_map(|day| {
                let date = current.date.checked_add_signed(Duration::try_days(day)?)?;
                Some(DaySnapshot {
                    date,
                    value: current.value,
                    prices: current.prices.clone(),
                })
            })
            .collect();

        filled.push(current);
        filled.extend(carried);
    }

    filled
}

/// Forward-fill `series` up to `terminal`, then drop `terminal`.
///
/// An empty series stays empty: nothing is synthesized before the first
/// real point.
pub fn fill_gaps_until(mut series: Vec<DaySnapshot>, terminal: DaySnapshot) -> Vec<DaySnapshot> {
    if series.is_empty() {
        return series;
    }
    series.push(terminal);
    let mut filled = fill_gaps(series);
    filled.pop();
    filled
}

impl WalletSimulator {
    pub(crate) fn record_snapshot(&mut self, at: DateTime<Utc>) -> Result<()> {
        let value = self.get_total_value()?;
        let key = day_key(at);
        trace!("Snapshot {} -> {} at {}", key, value, at);
        self.day_snapshots.insert(
            key,
            DaySnapshot {
                date: at,
                value,
                prices: self.prices.clone(),
            },
        );
        Ok(())
    }

    /// Stored snapshots dated within `[past, today]`, oldest first
    pub(crate) fn sorted_day_snapshots_on_range(
        &self,
        past: DateTime<Utc>,
        today: DateTime<Utc>,
    ) -> Vec<DaySnapshot> {
        self.day_snapshots
            .values()
            .filter(|snapshot| snapshot.date >= past && snapshot.date <= today)
            .cloned()
            .sorted_by_key(|snapshot| snapshot.date)
            .collect()
    }

    /// Sentinel closing point at `now`; only used to bound gap filling.
    pub(crate) fn terminal_point(&self, now: DateTime<Utc>) -> DaySnapshot {
        DaySnapshot {
            date: now,
            value: Decimal::NEGATIVE_ONE,
            prices: self.prices.clone(),
        }
    }

    /// Wallet valuation for each day from `back_days` ago through yesterday.
    ///
    /// Days without a mutation repeat the previous day's value. Days before
    /// the earliest stored snapshot in the window are not produced, so the
    /// result can be shorter than `back_days`.
    pub fn get_trend_balance_snapshots(&self, back_days: u32, now: DateTime<Utc>) -> Vec<DaySnapshot> {
        let today = days_before(now, 1);
        let past = days_before(now, i64::from(back_days));

        let series = self.sorted_day_snapshots_on_range(past, today);
        fill_gaps_until(series, self.terminal_point(now))
    }
}

//! Integration tests for trade execution and valuation
//!
//! These tests drive the public API end to end:
//! - Buys and sells with and without percentage fees
//! - Rejected trades, including out-of-range inputs, leave the wallet untouched
//! - Holdings listing and allocation breakdown
//! - Price updates and the day snapshots they write
//! - Realized profit per order adds up to the wallet's gain


use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wallet_helpers::*;
use wallet_simulator::{TradeOptions, TradeType, WalletConfig, WalletError, WalletSimulator};

#[test]
fn test_buy_moves_cash_into_position() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(1000));
    wallet.add_trade(TradeOptions::buy("AAPL", dec!(1)).at_price(dec!(100)))?;

    assert_eq!(wallet.get_balance(), dec!(900));
    assert_eq!(wallet.get_position_quantity("AAPL"), dec!(1));
    assert_eq!(wallet.get_total_value()?, dec!(1000));
    Ok(())
}

#[test]
fn test_buy_with_fee() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(1000));
    wallet.add_trade(
        TradeOptions::buy("AAPL", dec!(1))
            .at_price(dec!(100))
            .with_fee(dec!(0.1)),
    )?;

    assert_eq!(wallet.get_balance(), dec!(899.9));
    assert_eq!(wallet.get_total_value()?, dec!(999.9));
    // Fees stay out of the cost basis
    assert_eq!(wallet.get_position_average_cost("AAPL"), dec!(100));
    Ok(())
}

#[test]
fn test_sell_with_fee() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(1000));
    wallet
        .add_trade(TradeOptions::buy("AAPL", dec!(1)).at_price(dec!(100)))?
        .add_trade(
            TradeOptions::sell("AAPL", dec!(1))
                .at_price(dec!(120))
                .with_fee(dec!(0.1)),
        )?;

    assert_eq!(wallet.get_position_quantity("AAPL"), Decimal::ZERO);
    assert_eq!(wallet.get_total_value()?, dec!(1019.88));
    assert_eq!(wallet.cost_basis().get("AAPL"), Some(Decimal::ZERO));
    Ok(())
}

#[test]
fn test_commission_accumulates_over_buys() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(100));
    for price in [dec!(1), dec!(2), dec!(10), dec!(3), dec!(2)] {
        wallet.add_trade(
            TradeOptions::buy("BTC", dec!(1))
                .at_price(price)
                .with_fee(dec!(0.1)),
        )?;
    }

    assert_eq!(wallet.get_balance(), dec!(81.982));
    assert_eq!(wallet.get_position_quantity("BTC"), dec!(5));
    Ok(())
}

#[test]
fn test_average_cost_survives_partial_sell() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(1000));
    wallet
        .add_trade(TradeOptions::buy("ETH", dec!(2)).at_price(dec!(100)))?
        .add_trade(TradeOptions::buy("ETH", dec!(2)).at_price(dec!(200)))?
        .add_trade(TradeOptions::sell("ETH", dec!(1)).at_price(dec!(300)))?;

    assert_eq!(wallet.get_position_quantity("ETH"), dec!(3));
    assert_eq!(wallet.get_position_average_cost("ETH"), dec!(150));
    assert_eq!(wallet.get_estimated_liquidation_price("ETH"), dec!(150));
    // Marked at the last trade price of 300
    assert_eq!(wallet.get_estimated_unrealized_profit_loss("ETH")?, dec!(450));
    Ok(())
}

#[test]
fn test_rejected_trades_change_nothing() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(50));
    wallet.add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(10)))?;
    let before = wallet.export_state();

    let too_expensive = wallet.add_trade(TradeOptions::buy("BTC", dec!(10)).at_price(dec!(10)));
    assert!(matches!(too_expensive, Err(WalletError::InsufficientFunds { .. })));

    let oversell = wallet.add_trade(TradeOptions::sell("BTC", dec!(2)).at_price(dec!(10)));
    assert!(matches!(oversell, Err(WalletError::InsufficientHoldings { .. })));

    let unpriced = wallet.add_trade(TradeOptions::buy("DOGE", dec!(1)));
    assert!(matches!(unpriced, Err(WalletError::UnresolvablePrice(_))));

    let cash = wallet.add_trade(TradeOptions::buy("USDT", dec!(1)).at_price(dec!(1)));
    assert!(matches!(cash, Err(WalletError::InvalidTrade(_))));

    let huge = dec!(100000000000000000000);
    let overflowing = wallet.add_trade(TradeOptions::buy("BTC", huge).at_price(huge));
    assert!(matches!(overflowing, Err(WalletError::InvalidTrade(_))));

    let negative = wallet.add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(-5)));
    assert!(matches!(negative, Err(WalletError::InvalidTrade(_))));

    let far_future = wallet.add_trade(
        TradeOptions::sell("BTC", dec!(1))
            .at_price(dec!(10))
            .at_millis(i64::MAX),
    );
    assert!(matches!(far_future, Err(WalletError::InvalidTrade(_))));

    assert_eq!(wallet.export_state(), before);
    Ok(())
}

#[test]
fn test_negative_balance_when_allowed() -> Result<()> {
    let mut wallet = WalletSimulator::with_config(
        dec!(10),
        WalletConfig {
            allow_negative_balance: true,
            ..WalletConfig::default()
        },
    );
    wallet.add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(25)))?;

    assert_eq!(wallet.get_balance(), dec!(-15));
    assert_eq!(wallet.get_total_value()?, dec!(10));
    Ok(())
}

#[test]
fn test_owned_assets_keep_first_held_order() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(100));
    assert_eq!(wallet.get_all_owned_assets(), vec!["USDT"]);

    wallet
        .add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(1)))?
        .add_trade(TradeOptions::buy("ETH", dec!(1)).at_price(dec!(1)))?
        .add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(1)))?
        .add_trade(TradeOptions::sell("ETH", dec!(1)).at_price(dec!(1)))?;

    assert_eq!(wallet.get_all_owned_assets(), vec!["USDT", "BTC", "ETH"]);
    assert_eq!(wallet.get_position_quantity("ETH"), Decimal::ZERO);
    Ok(())
}

#[test]
fn test_donut_breakdown() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(21000));
    wallet
        .add_trade(TradeOptions::buy("AAPL", dec!(100)).at_price(dec!(100)))?
        .add_trade(TradeOptions::buy("GOOG", dec!(200)).at_price(dec!(50)))?;

    let donut = wallet.get_donut_asset_information()?;
    let tickers: Vec<&str> = donut.iter().map(|slice| slice.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["USDT", "AAPL", "GOOG"]);

    let values: Vec<Decimal> = donut.iter().map(|slice| slice.value).collect();
    assert_eq!(values, vec![dec!(1000), dec!(10000), dec!(10000)]);

    assert_eq!(donut[0].percentage.round_dp(6), dec!(4.761905));
    assert_eq!(donut[1].percentage.round_dp(6), dec!(47.619048));

    let total: Decimal = donut.iter().map(|slice| slice.percentage).sum();
    assert_eq!(total.round_dp(10), dec!(100));
    Ok(())
}

#[test]
fn test_total_value_is_cash_plus_positions() -> Result<()> {
    let clock = fixed_clock(frozen_now());
    let mut wallet = wallet_with_clock(dec!(5000), &clock);
    wallet
        .add_trade(TradeOptions::buy("BTC", dec!(0.5)).at_price(dec!(4000)))?
        .add_trade(TradeOptions::buy("ETH", dec!(3)).at_price(dec!(200)).with_fee(dec!(0.25)))?
        .update_price("BTC", dec!(4200), None)?
        .add_trade(TradeOptions::sell("ETH", dec!(1)).at_price(dec!(210)))?
        .update_price("ETH", dec!(190), None)?;

    assert_eq!(sum_of_parts(&wallet)?, wallet.get_total_value()?);
    Ok(())
}

#[test]
fn test_same_price_writes_no_snapshot() -> Result<()> {
    let now = frozen_now();
    let clock = fixed_clock(days_ago(now, 3));
    let mut wallet = wallet_with_clock(dec!(100), &clock);
    wallet.add_trade(TradeOptions::buy("BTC", dec!(1)).at_price(dec!(10)))?;
    assert_eq!(wallet.day_snapshots().len(), 1);

    clock.set(now);
    wallet.update_price("BTC", dec!(10), None)?;
    assert_eq!(wallet.day_snapshots().len(), 1);

    wallet.update_price("BTC", dec!(12), None)?;
    assert_eq!(wallet.day_snapshots().len(), 2);
    assert_eq!(wallet.get_total_value()?, dec!(102));
    Ok(())
}

#[test]
fn test_unknown_price_update_requires_priced_holdings() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(100));
    wallet.update_price("LTC", dec!(3), None)?;

    assert!(wallet.is_price_defined("LTC"));
    assert_eq!(wallet.get_position_quantity("LTC"), Decimal::ZERO);
    assert!(matches!(
        wallet.get_position_value("XRP"),
        Err(WalletError::UnknownPrice(_))
    ));
    Ok(())
}

#[test]
fn test_profits_add_up_to_gain() -> Result<()> {
    let now = frozen_now();
    let mut wallet = frozen_wallet(dec!(100));
    let legs = [
        (TradeType::Buy, dec!(1), dec!(1), 10),
        (TradeType::Buy, dec!(1), dec!(1), 7),
        (TradeType::Sell, dec!(1), dec!(2), 6),
        (TradeType::Buy, dec!(1), dec!(1), 5),
        (TradeType::Sell, dec!(1), dec!(2), 2),
        (TradeType::Buy, dec!(1), dec!(1), 6),
        (TradeType::Buy, dec!(1), dec!(1), 5),
        (TradeType::Sell, dec!(3), dec!(0.1), 2),
    ];
    for (side, quantity, price, age) in legs {
        wallet.add_trade(
            TradeOptions::new("BTC", quantity, side)
                .at_price(price)
                .at(days_ago(now, age)),
        )?;
    }

    let orders = wallet.pl_made_by_orders(None);
    let realized: Decimal = orders.iter().filter_map(|order| order.profit).sum();

    assert_eq!(realized, dec!(-0.7));
    assert_eq!(wallet.balance_at_wallet_creation() + realized, wallet.get_total_value()?);
    assert_eq!(wallet.get_total_value()?, dec!(99.3));
    Ok(())
}

#[test]
fn test_order_rows_mirror_trade_log() -> Result<()> {
    let mut wallet = frozen_wallet(dec!(1000));
    wallet
        .add_trade(TradeOptions::buy("SOL", dec!(4)).at_price(dec!(20)).with_id("b-1"))?
        .add_trade(
            TradeOptions::sell("SOL", dec!(4))
                .at_price(dec!(25))
                .with_fee(dec!(1))
                .with_id("s-1"),
        )?;

    let rows = wallet.pl_made_by_orders(None);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].order_id, "b-1");
    assert_eq!(rows[0].profit, None);
    assert_eq!(rows[1].side, TradeType::Sell);
    assert_eq!(rows[1].notional, dec!(100));
    // 100 - 80 - 1% of 100
    assert_eq!(rows[1].profit, Some(dec!(19)));

    let only_buy = &wallet.trades()[..1];
    assert_eq!(wallet.pl_made_by_orders(Some(only_buy)).len(), 1);

    let marked = wallet.trades_with_profits();
    assert_eq!(marked[1].profit, Some(dec!(19)));
    Ok(())
}

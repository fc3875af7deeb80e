//! Wallet Simulator - multi-asset trading wallet for backtests and paper trading
//!
//! This library keeps a cash balance and asset positions priced from a feed,
//! executes buy and sell orders with percentage fees, records one valuation
//! snapshot per day, and derives trend series, a buy-and-hold benchmark and
//! realized profit per order. Wallets export to JSON and restore from it.
//!
//! ```
//! use rust_decimal::Decimal;
//! use wallet_simulator::{TradeOptions, WalletSimulator};
//!
//! let mut wallet = WalletSimulator::new(Decimal::from(1000));
//! wallet
//!     .add_trade(TradeOptions::buy("AAPL", Decimal::ONE).at_price(Decimal::from(100)))
//!     .unwrap();
//! assert_eq!(wallet.get_balance(), Decimal::from(900));
//! assert_eq!(wallet.get_total_value().unwrap(), Decimal::from(1000));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod importers;
pub mod ledger;
pub mod models;
pub mod reports;
pub mod snapshots;
pub mod state;
pub mod wallet;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::WalletConfig;
pub use error::{Result, WalletError};
pub use importers::ExchangeTrade;
pub use ledger::AssetBook;
pub use models::{DaySnapshot, DonutAssetInfo, OrderMovementInfo, Trade, TradeOptions, TradeType};
pub use state::{WalletOverrides, WalletState};
pub use wallet::WalletSimulator;

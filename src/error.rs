//! Error handling for the wallet simulator
//!
//! Defines the error kinds raised by the ledger and a typed Result alias.
//! Every error is raised before any state mutation, so a failed call
//! leaves the wallet untouched.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core error types for wallet operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("insufficient funds to buy {quantity} {ticker} at ${price} (balance is {balance})")]
    InsufficientFunds {
        ticker: String,
        quantity: Decimal,
        price: Decimal,
        balance: Decimal,
    },

    #[error("cannot sell {quantity} {ticker} because only {owned} are held")]
    InsufficientHoldings {
        ticker: String,
        quantity: Decimal,
        owned: Decimal,
    },

    #[error("price for {0} is unknown")]
    UnknownPrice(String),

    #[error("cannot create new trade without knowing the price of {0}")]
    UnresolvablePrice(String),

    #[error("invalid trade: {0}")]
    InvalidTrade(String),

    #[error("arithmetic overflow while computing {0}")]
    Overflow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

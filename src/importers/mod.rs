// Import module - rebuilding wallets from exchange-reported history

pub mod exchange;

pub use exchange::{
    replay_exchange_history, ExchangeFee, ExchangeReplay, ExchangeSide, ExchangeTrade,
    HoldingMismatch,
};

// Reports module - benchmark curve and realized profit per order

pub mod buy_and_hold;
pub mod profit;

pub use profit::{calculate_profits, with_profits};

//! Crossing detection logic
//!
//! Determines when a taker can match a resting maker based on price
//! compatibility. MARKET takers always cross; they consume at the maker's
//! price.

use types::numeric::Price;
use types::order::Side;

/// Check if a LIMIT taker's price crosses a resting maker's price
///
/// - BUY taker matches only if `taker_price >= maker_price`
/// - SELL taker matches only if `taker_price <= maker_price`
pub fn limit_can_match(taker_side: Side, taker_price: Price, maker_price: Price) -> bool {
    match taker_side {
        Side::BUY => taker_price >= maker_price,
        Side::SELL => taker_price <= maker_price,
    }
}

/// Check if a taker crosses a maker; a taker with no price is a MARKET
/// order and always crosses
pub fn can_match(taker_side: Side, taker_price: Option<Price>, maker_price: Price) -> bool {
    match taker_price {
        Some(price) => limit_can_match(taker_side, price, maker_price),
        None => true,
    }
}

//! Market (currency pair) definitions

use crate::ids::MarketId;
use crate::numeric::Price;
use serde::{Deserialize, Serialize};

/// A tradable currency pair
///
/// `reference_price` tracks the last executed trade price and seeds the
/// notional cap for MARKET buy fund locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: MarketId,
    pub base_asset: String,
    pub quote_asset: String,
    pub reference_price: Option<Price>,
    pub active: bool,
    pub created_at: i64, // Unix nanos
}

impl Market {
    /// Create an active market from a "BASE/QUOTE" symbol
    pub fn new(symbol: MarketId, reference_price: Option<Price>, timestamp: i64) -> Self {
        let (base, quote) = symbol.split();
        let (base, quote) = (base.to_string(), quote.to_string());
        Self {
            symbol,
            base_asset: base,
            quote_asset: quote,
            reference_price,
            active: true,
            created_at: timestamp,
        }
    }
}

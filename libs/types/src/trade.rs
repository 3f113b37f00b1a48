//! Trade record types
//!
//! A trade is created exactly once per match event, after wallet settlement
//! has committed. Trade rows are append-only; the execution price is always
//! the resting (maker) order's price.

use crate::ids::{MarketId, OrderId, TradeId, UserId};
use crate::numeric::{notional, Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade between a buy order and a sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub sequence: u64, // Global monotonic sequence
    pub symbol: MarketId,

    // Order references
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,

    // Counterparties
    pub buyer_id: UserId,
    pub seller_id: UserId,

    // Execution details (price is the maker's price)
    pub price: Price,
    pub amount: Quantity,
    pub fee: Decimal,

    /// Which side the taker was on
    pub taker_side: Side,

    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Create a new trade record
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        symbol: MarketId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        buyer_id: UserId,
        seller_id: UserId,
        price: Price,
        amount: Quantity,
        fee: Decimal,
        taker_side: Side,
        executed_at: i64,
    ) -> Self {
        Self {
            id: TradeId::new(),
            sequence,
            symbol,
            buy_order_id,
            sell_order_id,
            buyer_id,
            seller_id,
            price,
            amount,
            fee,
            taker_side,
            executed_at,
        }
    }

    /// Quote value exchanged: price × amount
    pub fn trade_value(&self) -> Decimal {
        notional(self.price, self.amount)
    }

    /// A trade must never have the same user on both sides
    pub fn validate_no_self_trade(&self) -> bool {
        self.buyer_id != self.seller_id
    }
}

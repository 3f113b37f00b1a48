//! Order lifecycle types
//!
//! State machine: OPEN → {PARTIALLY_FILLED → FILLED | FILLED};
//! OPEN | PARTIALLY_FILLED → CANCELED. FILLED and CANCELED are terminal.

use crate::ids::{MarketId, OrderId, UserId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Order pricing type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Rests at its limit price when not immediately matchable
    LIMIT,
    /// Consumes opposing liquidity at maker prices; never rests
    MARKET,
}

/// Why an order was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequested,
    SelfTrade,
    AdminCancel,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    /// Accepted, no fills yet
    #[serde(rename = "OPEN")]
    Open,

    /// Partially matched
    #[serde(rename = "PARTIALLY_FILLED")]
    PartiallyFilled,

    /// Completely matched (terminal)
    #[serde(rename = "FILLED")]
    Filled,

    /// Canceled by user or system (terminal)
    #[serde(rename = "CANCELED")]
    Canceled(CancelReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled(_))
    }
}

/// A spot order row
///
/// Created once at admission with status OPEN and filled = 0; mutated only
/// by the matching engine (filled, status, lock consumption) and by explicit
/// cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; None for MARKET orders
    pub price: Option<Price>,
    pub amount: Quantity,
    pub filled: Quantity,
    /// Admission-locked funds not yet consumed by fills: quote units for
    /// BUY orders, base units for SELL orders. Released on cancel and by
    /// MARKET-order true-up.
    pub locked_remaining: Decimal,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
    pub version: u64,    // Optimistic locking
}

impl Order {
    /// Create a new open order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        symbol: MarketId,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        amount: Quantity,
        locked: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            symbol,
            side,
            order_type,
            price,
            amount,
            filled: Quantity::zero(),
            locked_remaining: locked,
            status: OrderStatus::Open,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    /// Unfilled portion: amount − filled
    pub fn remaining(&self) -> Quantity {
        self.amount
            .checked_sub(self.filled)
            .unwrap_or_else(Quantity::zero)
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled == self.amount
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled.is_zero()
    }

    /// Check if the order may still be canceled
    pub fn is_cancelable(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Quantity invariant: 0 ≤ filled ≤ amount
    pub fn check_invariant(&self) -> bool {
        self.filled.as_decimal() <= self.amount.as_decimal()
            && self.locked_remaining >= Decimal::ZERO
    }

    /// Update filled quantity and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed total quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: i64) {
        let new_filled = self.filled + fill_quantity;

        assert!(
            new_filled.as_decimal() <= self.amount.as_decimal(),
            "Fill would exceed order amount"
        );

        self.filled = new_filled;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::PartiallyFilled;
        }

        self.updated_at = timestamp;
        self.version += 1;

        assert!(self.check_invariant(), "Invariant violated after fill");
    }

    /// Consume part of the admission lock (floored at zero)
    pub fn consume_lock(&mut self, amount: Decimal) {
        self.locked_remaining = (self.locked_remaining - amount).max(Decimal::ZERO);
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn cancel(&mut self, reason: CancelReason, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");

        self.status = OrderStatus::Canceled(reason);
        self.updated_at = timestamp;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_buy(amount: &str) -> Order {
        let price = Price::from_u64(100);
        let qty = Quantity::from_str(amount).unwrap();
        Order::new(
            UserId::new(),
            MarketId::new("BTC/USDT"),
            Side::BUY,
            OrderType::LIMIT,
            Some(price),
            qty,
            price.as_decimal() * qty.as_decimal(),
            1708123456789000000,
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_order_creation() {
        let order = limit_buy("1.0");

        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.remaining(), Quantity::from_str("1.0").unwrap());
        assert!(!order.has_fills());
        assert!(order.is_cancelable());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = limit_buy("1.0");

        // Partial fill
        order.add_fill(Quantity::from_str("0.3").unwrap(), 1708123456790000000);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert!(order.has_fills());
        assert!(!order.is_filled());
        assert_eq!(order.remaining(), Quantity::from_str("0.7").unwrap());

        // Complete fill
        order.add_fill(Quantity::from_str("0.7").unwrap(), 1708123456791000000);
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_filled());
        assert!(order.status.is_terminal());
    }

    #[test]
    #[should_panic(expected = "Fill would exceed order amount")]
    fn test_order_overfill_panics() {
        let mut order = limit_buy("1.0");
        order.add_fill(Quantity::from_str("1.5").unwrap(), 1708123456790000000);
    }

    #[test]
    fn test_fill_monotonicity() {
        let mut order = limit_buy("1.0");
        let mut last = order.filled;

        for _ in 0..4 {
            order.add_fill(Quantity::from_str("0.25").unwrap(), 1708123456790000000);
            assert!(order.filled >= last);
            assert!(order.filled <= order.amount);
            last = order.filled;
        }
    }

    #[test]
    fn test_order_cancel() {
        let mut order = limit_buy("1.0");

        order.cancel(CancelReason::UserRequested, 1708123456790000000);
        assert_eq!(
            order.status,
            OrderStatus::Canceled(CancelReason::UserRequested)
        );
        assert!(order.status.is_terminal());
        assert!(!order.is_cancelable());
    }

    #[test]
    #[should_panic(expected = "Cannot cancel terminal order")]
    fn test_cancel_terminal_panics() {
        let mut order = limit_buy("1.0");
        order.add_fill(Quantity::from_str("1.0").unwrap(), 1708123456790000000);
        order.cancel(CancelReason::UserRequested, 1708123456791000000);
    }

    #[test]
    fn test_consume_lock_floors_at_zero() {
        let mut order = limit_buy("1.0"); // locked 100
        order.consume_lock(Decimal::from(60));
        assert_eq!(order.locked_remaining, Decimal::from(40));

        order.consume_lock(Decimal::from(50));
        assert_eq!(order.locked_remaining, Decimal::ZERO);
    }

    #[test]
    fn test_order_serialization() {
        let order = limit_buy("2.5");
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(order.id, deserialized.id);
        assert_eq!(order.side, deserialized.side);
        assert_eq!(order.price, deserialized.price);
        assert_eq!(order.status, deserialized.status);
    }
}

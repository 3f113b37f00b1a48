//! Per-market order book
//!
//! Price-time priority structure of resting orders: bids ranked
//! highest-price-first, asks lowest-price-first, FIFO by arrival sequence
//! within a price level. All operations are immediately consistent; removal
//! is idempotent.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;

use price_level::LevelEntry;
use types::ids::{OrderId, UserId};
use types::numeric::Price;
use types::order::Side;

/// Reference to a resting order held by the book
///
/// The book stores references only; the order row itself lives in the order
/// store. `arrival_seq` is assigned when the order is first inserted and
/// preserved across remove/reinsert cycles during partial fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestingRef {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub price: Price,
    pub arrival_seq: u64,
}

impl RestingRef {
    pub(crate) fn entry(&self) -> LevelEntry {
        LevelEntry {
            order_id: self.order_id,
            user_id: self.user_id,
            arrival_seq: self.arrival_seq,
        }
    }
}

/// Both sides of a single market's book
#[derive(Debug, Clone, Default)]
pub struct MarketBook {
    bids: BidBook,
    asks: AskBook,
}

impl MarketBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    /// Insert a resting order on the given side
    pub fn add(&mut self, side: Side, resting: &RestingRef) {
        match side {
            Side::BUY => self.bids.insert(resting),
            Side::SELL => self.asks.insert(resting),
        }
    }

    /// Remove an order; a no-op returning false when absent
    pub fn remove(&mut self, side: Side, order_id: &OrderId, price: Price) -> bool {
        match side {
            Side::BUY => self.bids.remove(order_id, price),
            Side::SELL => self.asks.remove(order_id, price),
        }
    }

    /// The single most matchable resting order on the given side
    pub fn peek_best(&self, side: Side) -> Option<RestingRef> {
        match side {
            Side::BUY => self.bids.best(),
            Side::SELL => self.asks.best(),
        }
    }

    /// Best bid and ask prices
    pub fn top_of_book(&self) -> (Option<Price>, Option<Price>) {
        (self.bids.best_price(), self.asks.best_price())
    }

    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(price: u64, seq: u64) -> RestingRef {
        RestingRef {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            price: Price::from_u64(price),
            arrival_seq: seq,
        }
    }

    #[test]
    fn test_market_book_sides_are_independent() {
        let mut book = MarketBook::new();
        let bid = resting(49000, 1);
        let ask = resting(51000, 2);

        book.add(Side::BUY, &bid);
        book.add(Side::SELL, &ask);

        assert_eq!(book.peek_best(Side::BUY).unwrap().order_id, bid.order_id);
        assert_eq!(book.peek_best(Side::SELL).unwrap().order_id, ask.order_id);
        assert_eq!(
            book.top_of_book(),
            (Some(Price::from_u64(49000)), Some(Price::from_u64(51000)))
        );
    }

    #[test]
    fn test_market_book_remove_wrong_side_is_noop() {
        let mut book = MarketBook::new();
        let bid = resting(49000, 1);
        book.add(Side::BUY, &bid);

        assert!(!book.remove(Side::SELL, &bid.order_id, bid.price));
        assert!(book.remove(Side::BUY, &bid.order_id, bid.price));
        assert!(book.is_empty());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut book = MarketBook::new();
        let ask = resting(51000, 1);
        book.add(Side::SELL, &ask);

        assert!(book.peek_best(Side::SELL).is_some());
        assert!(book.peek_best(Side::SELL).is_some());
    }
}

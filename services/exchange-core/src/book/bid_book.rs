//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order; at each price level,
//! orders are kept in arrival order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;
use super::RestingRef;

/// Bid (buy) side order book
///
/// Orders are sorted by price descending, so the highest bid is first.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; BTreeMap iterates ascending, best bid is `next_back()`
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert a resting order reference
    pub fn insert(&mut self, resting: &RestingRef) {
        let level = self.levels.entry(resting.price).or_default();
        level.insert(resting.entry());
    }

    /// Remove an order from the bid book
    ///
    /// Idempotent: returns false (not an error) when the order is not present.
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                // Remove empty price levels to keep the book clean
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// The most matchable bid: highest price, earliest arrival
    pub fn best(&self) -> Option<RestingRef> {
        self.levels.iter().next_back().and_then(|(price, level)| {
            level.peek_front().map(|entry| RestingRef {
                order_id: entry.order_id,
                user_id: entry.user_id,
                price: *price,
                arrival_seq: entry.arrival_seq,
            })
        })
    }

    /// Get the best bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;

    fn resting(price: u64, seq: u64) -> RestingRef {
        RestingRef {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            price: Price::from_u64(price),
            arrival_seq: seq,
        }
    }

    #[test]
    fn test_bid_book_insert() {
        let mut book = BidBook::new();
        book.insert(&resting(50000, 1));

        assert_eq!(book.level_count(), 1);
        assert!(!book.is_empty());
    }

    #[test]
    fn test_bid_book_best_is_highest_price() {
        let mut book = BidBook::new();
        let mid = resting(50000, 1);
        let high = resting(51000, 2);
        let low = resting(49000, 3);

        book.insert(&mid);
        book.insert(&high);
        book.insert(&low);

        let best = book.best().unwrap();
        assert_eq!(best.price, Price::from_u64(51000));
        assert_eq!(best.order_id, high.order_id);
    }

    #[test]
    fn test_bid_book_time_priority_within_level() {
        let mut book = BidBook::new();
        let earlier = resting(50000, 1);
        let later = resting(50000, 2);

        // Insert out of arrival order; the earlier sequence still wins
        book.insert(&later);
        book.insert(&earlier);

        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best().unwrap().order_id, earlier.order_id);
    }

    #[test]
    fn test_bid_book_remove() {
        let mut book = BidBook::new();
        let order = resting(50000, 1);

        book.insert(&order);
        assert!(book.remove(&order.order_id, order.price));
        assert!(book.is_empty());

        // Removing again is a no-op, not an error
        assert!(!book.remove(&order.order_id, order.price));
    }

    #[test]
    fn test_bid_book_best_price() {
        let mut book = BidBook::new();
        assert_eq!(book.best_price(), None);

        book.insert(&resting(50000, 1));
        book.insert(&resting(52000, 2));
        assert_eq!(book.best_price(), Some(Price::from_u64(52000)));
    }
}

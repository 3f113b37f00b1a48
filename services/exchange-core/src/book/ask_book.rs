//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;
use super::RestingRef;

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels; BTreeMap iterates ascending, best ask is `next()`
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
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

    /// Remove an order from the ask book
    ///
    /// Idempotent: returns false (not an error) when the order is not present.
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// The most matchable ask: lowest price, earliest arrival
    pub fn best(&self) -> Option<RestingRef> {
        self.levels.iter().next().and_then(|(price, level)| {
            level.peek_front().map(|entry| RestingRef {
                order_id: entry.order_id,
                user_id: entry.user_id,
                price: *price,
                arrival_seq: entry.arrival_seq,
            })
        })
    }

    /// Get the best ask price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Check if the ask book is empty
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
    fn test_ask_book_best_is_lowest_price() {
        let mut book = AskBook::new();
        let mid = resting(50000, 1);
        let low = resting(49000, 2);
        let high = resting(51000, 3);

        book.insert(&mid);
        book.insert(&low);
        book.insert(&high);

        let best = book.best().unwrap();
        assert_eq!(best.price, Price::from_u64(49000));
        assert_eq!(best.order_id, low.order_id);
    }

    #[test]
    fn test_ask_book_time_priority_within_level() {
        let mut book = AskBook::new();
        let earlier = resting(50000, 1);
        let later = resting(50000, 2);

        book.insert(&earlier);
        book.insert(&later);

        assert_eq!(book.best().unwrap().order_id, earlier.order_id);
    }

    #[test]
    fn test_ask_book_remove_clears_empty_levels() {
        let mut book = AskBook::new();
        let order = resting(50000, 1);

        book.insert(&order);
        assert_eq!(book.level_count(), 1);

        assert!(book.remove(&order.order_id, order.price));
        assert_eq!(book.level_count(), 0);
        assert!(!book.remove(&order.order_id, order.price));
    }
}

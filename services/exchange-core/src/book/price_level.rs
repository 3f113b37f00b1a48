//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at a specific price point,
//! ordered by arrival sequence to enforce time priority. Reinserting a
//! partially filled maker with its original arrival sequence restores it to
//! its original queue position, so a partial fill never costs an order its
//! place in line.

use std::collections::VecDeque;
use types::ids::{OrderId, UserId};

/// Entry in the price level queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub arrival_seq: u64,
}

/// A price level containing orders at a specific price
///
/// Maintains strict arrival-sequence ordering for time-priority matching.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Queue of orders at this price, ascending by arrival sequence
    orders: VecDeque<LevelEntry>,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
        }
    }

    /// Insert an entry, keeping the queue sorted by arrival sequence
    ///
    /// New arrivals carry the highest sequence seen so far and land at the
    /// back; a reinserted maker slots back into its original position.
    pub fn insert(&mut self, entry: LevelEntry) {
        let position = self
            .orders
            .iter()
            .position(|existing| existing.arrival_seq > entry.arrival_seq)
            .unwrap_or(self.orders.len());
        self.orders.insert(position, entry);
    }

    /// Remove an order from the queue by OrderId
    ///
    /// Idempotent: returns None (not an error) when the order is not present.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<LevelEntry> {
        let position = self
            .orders
            .iter()
            .position(|entry| &entry.order_id == order_id)?;
        self.orders.remove(position)
    }

    /// Peek at the front order without removing it
    pub fn peek_front(&self) -> Option<LevelEntry> {
        self.orders.front().copied()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

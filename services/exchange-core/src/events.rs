//! Events emitted by the matching pipeline
//!
//! Downstream collaborators (websocket push, candle aggregation) subscribe to
//! a broadcast bus; events are published only after the corresponding rows
//! have been committed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use types::ids::{OrderId, TradeId, UserId};
use types::numeric::{Price, Quantity};
use types::order::{OrderStatus, Side};
use types::trade::Trade;

/// Trade committed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecuted {
    pub trade_id: TradeId,
    pub sequence: u64,
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub price: Price,
    pub amount: Quantity,
    pub taker_side: Side,
    pub executed_at: i64,
}

impl From<&Trade> for TradeExecuted {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id,
            sequence: trade.sequence,
            symbol: trade.symbol.as_str().to_string(),
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            buyer_id: trade.buyer_id,
            seller_id: trade.seller_id,
            price: trade.price,
            amount: trade.amount,
            taker_side: trade.taker_side,
            executed_at: trade.executed_at,
        }
    }
}

/// Order status change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub filled: Quantity,
}

/// Any event leaving the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExchangeEvent {
    Trade(TradeExecuted),
    Order(OrderStatusChanged),
}

/// Broadcast fan-out for committed events
///
/// Slow subscribers lag rather than block the matching pipeline.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ExchangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: ExchangeEvent) {
        let _ = self.tx.send(event);
    }
}

//! Exchange facade
//!
//! Wires the stores, admission stage, per-market consumer tasks, settlement
//! executor, and event bus together behind one handle. Must be constructed
//! inside a Tokio runtime because opening a market spawns its consumer.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use types::errors::ExchangeError;
use types::ids::{MarketId, OrderId, UserId};
use types::market::Market;
use types::numeric::Price;
use types::order::Order;
use types::time::now_nanos;
use types::trade::Trade;
use types::wallet::{Wallet, WalletKey, WalletType};

use crate::admission::{OrderAdmission, OrderRequest};
use crate::config::ExchangeConfig;
use crate::engine::MatchEngine;
use crate::events::{EventBus, ExchangeEvent};
use crate::queue::{spawn_consumer, MarketQueue};
use crate::settlement::SettlementExecutor;
use crate::store::{MarketStore, OrderStore, TradeStore, WalletStore};

pub struct Exchange {
    config: ExchangeConfig,
    orders: Arc<OrderStore>,
    trades: Arc<TradeStore>,
    wallets: Arc<WalletStore>,
    markets: Arc<MarketStore>,
    settlement: Arc<SettlementExecutor>,
    admission: OrderAdmission,
    queues: DashMap<String, MarketQueue>,
    consumers: Mutex<Vec<JoinHandle<()>>>,
    events: EventBus,
}

impl Exchange {
    pub fn new(config: ExchangeConfig) -> Self {
        let orders = Arc::new(OrderStore::new());
        let trades = Arc::new(TradeStore::new());
        let wallets = Arc::new(WalletStore::new());
        let markets = Arc::new(MarketStore::new());
        let settlement = Arc::new(SettlementExecutor::new(
            1,
            config.fee_rate,
            Arc::clone(&wallets),
            Arc::clone(&trades),
            Arc::clone(&markets),
        ));
        let admission = OrderAdmission::new(
            Arc::clone(&markets),
            Arc::clone(&orders),
            Arc::clone(&wallets),
            config.market_buy_buffer,
        );
        let events = EventBus::new(config.event_capacity);
        Self {
            config,
            orders,
            trades,
            wallets,
            markets,
            settlement,
            admission,
            queues: DashMap::new(),
            consumers: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Register a market and start its consumer task
    ///
    /// Re-opening a known symbol is a Conflict; the running consumer owns
    /// the book.
    pub fn open_market(
        &self,
        symbol: &str,
        reference_price: Option<Price>,
    ) -> Result<Market, ExchangeError> {
        let symbol = MarketId::try_new(symbol).ok_or_else(|| {
            ExchangeError::Validation("market symbol must be BASE/QUOTE".to_string())
        })?;
        if self.queues.contains_key(symbol.as_str()) {
            return Err(ExchangeError::Conflict(format!(
                "market {symbol} is already open"
            )));
        }

        let market = Market::new(symbol.clone(), reference_price, now_nanos());
        self.markets.insert(market.clone());

        let engine = MatchEngine::new(
            market.clone(),
            Arc::clone(&self.orders),
            Arc::clone(&self.wallets),
            Arc::clone(&self.settlement),
            self.events.clone(),
        );
        let (queue, rx) = MarketQueue::new(self.config.queue_depth);
        self.queues.insert(symbol.as_str().to_string(), queue);
        self.consumers.lock().push(spawn_consumer(engine, rx));

        tracing::info!(symbol = %market.symbol, "market opened");
        Ok(market)
    }

    fn queue_for(&self, symbol: &str) -> Result<MarketQueue, ExchangeError> {
        self.queues
            .get(symbol)
            .map(|entry| entry.clone())
            .ok_or_else(|| ExchangeError::MarketNotFound {
                symbol: symbol.to_string(),
            })
    }

    /// Admit an order; matching happens asynchronously on the market's task
    pub fn submit_order(
        &self,
        user_id: UserId,
        request: OrderRequest,
    ) -> Result<Order, ExchangeError> {
        let queue = self.queue_for(&request.symbol)?;
        self.admission.submit(user_id, request, &queue)
    }

    /// Cancel an order through its market's queue
    ///
    /// Awaits the engine's verdict, so a returned Ok means the remaining
    /// lock has been released.
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<(), ExchangeError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        let queue = self.queue_for(order.symbol.as_str())?;
        queue.enqueue_cancel(order_id, user_id).await
    }

    /// Fund a user's spot wallet
    pub fn credit(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
    ) -> Result<(), ExchangeError> {
        self.wallets.credit(user_id, currency, WalletType::SPOT, amount)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.events.subscribe()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id)
    }

    pub fn wallet(&self, user_id: UserId, currency: &str) -> Option<Wallet> {
        self.wallets.get(&WalletKey::spot(user_id, currency))
    }

    pub fn trades_for(&self, symbol: &str) -> Vec<Trade> {
        self.trades.for_symbol(&MarketId::new(symbol))
    }

    pub fn market(&self, symbol: &str) -> Option<Market> {
        self.markets.find_by_symbol(symbol)
    }

    /// Σ(available + frozen) over one currency, for conservation checks
    pub fn total_for_currency(&self, currency: &str) -> Decimal {
        self.wallets.total_for_currency(currency)
    }

    /// Stop all consumers and wait for them to drain
    pub async fn shutdown(&self) {
        self.queues.clear();
        let handles: Vec<JoinHandle<()>> = self.consumers.lock().drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(%err, "market consumer panicked");
            }
        }
    }
}

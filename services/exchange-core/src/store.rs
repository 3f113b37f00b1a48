//! In-memory stores for Order, Trade, Wallet, and Market rows
//!
//! The book and queues can be rebuilt from OPEN/PARTIALLY_FILLED order rows,
//! so these rows are the only durable state the core needs. Wallet rows get
//! an individual mutex because a user trading several markets at once can
//! touch the same wallet from different consumer tasks.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::sync::Arc;
use types::errors::ExchangeError;
use types::ids::{MarketId, OrderId, UserId};
use types::market::Market;
use types::numeric::Price;
use types::order::Order;
use types::time::now_nanos;
use types::trade::Trade;
use types::wallet::{Wallet, WalletKey, WalletType};

/// Order rows keyed by id
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<OrderId, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new order row
    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    /// Snapshot an order row
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.clone())
    }

    /// Persist updated filled/status/lock fields
    pub fn update(&self, order: &Order) {
        self.orders.insert(order.id, order.clone());
    }

    /// Delete a row (admission rollback only)
    pub fn remove(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.remove(order_id).map(|(_, order)| order)
    }

    /// Non-terminal orders for one market, in arrival order
    ///
    /// Used to rebuild the book when a market consumer starts.
    pub fn resting_for_symbol(&self, symbol: &MarketId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.symbol == *symbol && !entry.status.is_terminal())
            .map(|entry| entry.clone())
            .collect();
        orders.sort_by_key(|order| (order.created_at, order.id));
        orders
    }
}

/// Append-only trade log
#[derive(Debug, Default)]
pub struct TradeStore {
    trades: RwLock<Vec<Trade>>,
}

impl TradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed trade
    pub fn append(&self, trade: Trade) {
        self.trades.write().push(trade);
    }

    /// Snapshot of all trades in commit order
    pub fn all(&self) -> Vec<Trade> {
        self.trades.read().clone()
    }

    /// Trades for one market, in commit order
    pub fn for_symbol(&self, symbol: &MarketId) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .filter(|trade| trade.symbol == *symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }
}

/// Wallet rows keyed by (user, currency, wallet type)
///
/// Each row carries its own mutex; multi-row settlement locks rows in
/// canonical key order.
#[derive(Debug, Default)]
pub struct WalletStore {
    wallets: DashMap<WalletKey, Arc<Mutex<Wallet>>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit available funds, creating the row on first use
    ///
    /// Store-level funding primitive; deposit *flows* live outside the core.
    pub fn credit(
        &self,
        user_id: UserId,
        currency: &str,
        wallet_type: WalletType,
        amount: Decimal,
    ) -> Result<(), ExchangeError> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::Validation(
                "credit amount must be positive".to_string(),
            ));
        }
        let key = WalletKey {
            user_id,
            currency: currency.to_string(),
            wallet_type,
        };
        let handle = self.ensure(&key);
        let mut wallet = handle.lock();
        wallet.available += amount;
        wallet.recalculate(now_nanos());
        Ok(())
    }

    /// Snapshot a wallet row
    pub fn get(&self, key: &WalletKey) -> Option<Wallet> {
        self.handle(key).map(|handle| handle.lock().clone())
    }

    /// Row handle for multi-wallet locking
    pub(crate) fn handle(&self, key: &WalletKey) -> Option<Arc<Mutex<Wallet>>> {
        self.wallets.get(key).map(|entry| entry.clone())
    }

    /// Row handle, creating an empty row on first use
    ///
    /// The receiving side of a settlement may never have held the currency;
    /// its row comes into existence with the first incoming funds.
    pub(crate) fn ensure(&self, key: &WalletKey) -> Arc<Mutex<Wallet>> {
        self.wallets
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Wallet::new(
                    key.user_id,
                    key.currency.clone(),
                    key.wallet_type,
                    now_nanos(),
                )))
            })
            .clone()
    }

    fn require(&self, key: &WalletKey) -> Result<Arc<Mutex<Wallet>>, ExchangeError> {
        self.handle(key)
            .ok_or_else(|| ExchangeError::WalletNotFound {
                user_id: key.user_id.to_string(),
                currency: key.currency.clone(),
                wallet_type: format!("{:?}", key.wallet_type),
            })
    }

    /// Reserve funds against an order under the row lock
    ///
    /// The sufficiency check and the debit happen under one lock, so a
    /// concurrent submission against the same wallet cannot double-spend.
    pub fn lock_funds(&self, key: &WalletKey, amount: Decimal) -> Result<(), ExchangeError> {
        let handle = self.require(key)?;
        let mut wallet = handle.lock();
        if wallet.available < amount {
            return Err(ExchangeError::InsufficientBalance {
                currency: key.currency.clone(),
                required: amount.to_string(),
                available: wallet.available.to_string(),
            });
        }
        wallet.lock(amount, now_nanos());
        Ok(())
    }

    /// Release reserved funds under the row lock
    pub fn unlock_funds(&self, key: &WalletKey, amount: Decimal) -> Result<(), ExchangeError> {
        let handle = self.require(key)?;
        let mut wallet = handle.lock();
        wallet.unlock(amount, now_nanos());
        Ok(())
    }

    /// Σ(available + frozen) over all rows of one currency
    ///
    /// Conservation observable: settlement must leave this unchanged.
    pub fn total_for_currency(&self, currency: &str) -> Decimal {
        self.wallets
            .iter()
            .filter(|entry| entry.key().currency == currency)
            .map(|entry| {
                let wallet = entry.value().lock();
                wallet.available + wallet.frozen
            })
            .sum()
    }

    /// All wallet snapshots (test/diagnostic use)
    pub fn snapshot(&self) -> Vec<Wallet> {
        self.wallets
            .iter()
            .map(|entry| entry.value().lock().clone())
            .collect()
    }
}

/// Market definitions keyed by symbol string
#[derive(Debug, Default)]
pub struct MarketStore {
    markets: DashMap<String, Market>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, market: Market) {
        self.markets.insert(market.symbol.as_str().to_string(), market);
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<Market> {
        self.markets.get(symbol).map(|entry| entry.clone())
    }

    /// Record the last trade price as the market's reference price
    pub fn set_reference_price(&self, symbol: &MarketId, price: Price) {
        if let Some(mut market) = self.markets.get_mut(symbol.as_str()) {
            market.reference_price = Some(price);
        }
    }
}

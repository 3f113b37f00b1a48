//! Order admission
//!
//! Validates an incoming request, reserves funds, persists the order row,
//! and hands it to the market's queue. Runs on the caller's thread; only the
//! match pass itself is serialized per market.
//!
//! Fund locking before enqueue guarantees an order can never reach the
//! engine without its fills being payable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use types::errors::ExchangeError;
use types::ids::UserId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side};
use types::time::now_nanos;
use types::wallet::WalletKey;

use crate::queue::MarketQueue;
use crate::store::{MarketStore, OrderStore, WalletStore};

/// An order submission as received from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Required for LIMIT; ignored for MARKET
    pub price: Option<Price>,
    pub amount: Quantity,
}

/// Admission stage shared by all markets
pub struct OrderAdmission {
    markets: Arc<MarketStore>,
    orders: Arc<OrderStore>,
    wallets: Arc<WalletStore>,
    market_buy_buffer: Decimal,
}

impl OrderAdmission {
    pub fn new(
        markets: Arc<MarketStore>,
        orders: Arc<OrderStore>,
        wallets: Arc<WalletStore>,
        market_buy_buffer: Decimal,
    ) -> Self {
        Self {
            markets,
            orders,
            wallets,
            market_buy_buffer,
        }
    }

    /// Validate, lock funds, persist, enqueue
    ///
    /// Returns the admitted order snapshot (status OPEN). On enqueue failure
    /// the lock and the order row are both rolled back, leaving no trace.
    pub fn submit(
        &self,
        user_id: UserId,
        request: OrderRequest,
        queue: &MarketQueue,
    ) -> Result<Order, ExchangeError> {
        if request.amount.is_zero() {
            return Err(ExchangeError::Validation(
                "order amount must be positive".to_string(),
            ));
        }
        if request.order_type == OrderType::LIMIT && request.price.is_none() {
            return Err(ExchangeError::Validation(
                "limit orders require a price".to_string(),
            ));
        }

        let market = self
            .markets
            .find_by_symbol(&request.symbol)
            .ok_or_else(|| ExchangeError::MarketNotFound {
                symbol: request.symbol.clone(),
            })?;
        if !market.active {
            return Err(ExchangeError::Conflict(format!(
                "market {} is not accepting orders",
                market.symbol
            )));
        }

        // Any price on a MARKET request is ignored
        let price = match request.order_type {
            OrderType::LIMIT => request.price,
            OrderType::MARKET => None,
        };

        let (lock_currency, lock_amount) = match (request.side, request.order_type) {
            (Side::BUY, OrderType::LIMIT) => {
                let limit = price.expect("validated above");
                (
                    market.quote_asset.clone(),
                    limit.as_decimal() * request.amount.as_decimal(),
                )
            }
            (Side::BUY, OrderType::MARKET) => {
                // Worst-case notional cap around the last trade price
                let reference = market.reference_price.ok_or_else(|| {
                    ExchangeError::Validation(
                        "market has no reference price for a market buy".to_string(),
                    )
                })?;
                let cap = reference.as_decimal()
                    * request.amount.as_decimal()
                    * (Decimal::ONE + self.market_buy_buffer);
                (market.quote_asset.clone(), cap)
            }
            (Side::SELL, _) => (market.base_asset.clone(), request.amount.as_decimal()),
        };

        let key = WalletKey::spot(user_id, lock_currency);
        self.wallets.lock_funds(&key, lock_amount)?;

        let order = Order::new(
            user_id,
            market.symbol.clone(),
            request.side,
            request.order_type,
            price,
            request.amount,
            lock_amount,
            now_nanos(),
        );
        self.orders.insert(order.clone());

        if let Err(err) = queue.enqueue_submit(order.id) {
            // Roll back so a rejected submission leaves no side effects
            self.orders.remove(&order.id);
            if let Err(unlock_err) = self.wallets.unlock_funds(&key, lock_amount) {
                tracing::error!(
                    order_id = %order.id,
                    %unlock_err,
                    "rollback unlock failed after enqueue rejection"
                );
            }
            return Err(err);
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::MarketId;
    use types::market::Market;
    use types::order::OrderStatus;
    use types::wallet::WalletType;

    fn setup() -> (OrderAdmission, Arc<WalletStore>, Arc<OrderStore>) {
        let markets = Arc::new(MarketStore::new());
        let orders = Arc::new(OrderStore::new());
        let wallets = Arc::new(WalletStore::new());
        markets.insert(Market::new(
            MarketId::new("BTC/USDT"),
            Some(Price::from_u64(100)),
            1708123456789000000,
        ));
        let admission = OrderAdmission::new(
            markets,
            Arc::clone(&orders),
            Arc::clone(&wallets),
            Decimal::new(5, 2),
        );
        (admission, wallets, orders)
    }

    fn limit_buy_request(price: u64, amount: &str) -> OrderRequest {
        OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: Side::BUY,
            order_type: OrderType::LIMIT,
            price: Some(Price::from_u64(price)),
            amount: Quantity::from_str(amount).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_limit_buy_locks_quote_notional() {
        let (admission, wallets, _) = setup();
        let user = UserId::new();
        wallets
            .credit(user, "USDT", WalletType::SPOT, Decimal::from(1000))
            .unwrap();
        let (queue, mut rx) = MarketQueue::new(8);

        let order = admission
            .submit(user, limit_buy_request(100, "2.0"), &queue)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.locked_remaining, Decimal::from(200));

        let wallet = wallets.get(&WalletKey::spot(user, "USDT")).unwrap();
        assert_eq!(wallet.frozen, Decimal::from(200));
        assert_eq!(wallet.available, Decimal::from(800));

        // The order reached the queue
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_market_buy_locks_buffered_notional() {
        let (admission, wallets, _) = setup();
        let user = UserId::new();
        wallets
            .credit(user, "USDT", WalletType::SPOT, Decimal::from(1000))
            .unwrap();
        let (queue, _rx) = MarketQueue::new(8);

        let request = OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: Side::BUY,
            order_type: OrderType::MARKET,
            price: Some(Price::from_u64(999)), // ignored
            amount: Quantity::from_str("2.0").unwrap(),
        };
        let order = admission.submit(user, request, &queue).unwrap();

        // 100 × 2.0 × 1.05
        assert_eq!(order.locked_remaining, Decimal::from(210));
        assert!(order.price.is_none());
    }

    #[tokio::test]
    async fn test_market_buy_without_reference_price_rejected() {
        let (admission, wallets, _) = setup();
        let markets = Arc::new(MarketStore::new());
        markets.insert(Market::new(
            MarketId::new("ETH/USDT"),
            None,
            1708123456789000000,
        ));
        let admission = OrderAdmission::new(
            markets,
            Arc::new(OrderStore::new()),
            Arc::clone(&wallets),
            admission.market_buy_buffer,
        );
        let user = UserId::new();
        wallets
            .credit(user, "USDT", WalletType::SPOT, Decimal::from(1000))
            .unwrap();
        let (queue, _rx) = MarketQueue::new(8);

        let request = OrderRequest {
            symbol: "ETH/USDT".to_string(),
            side: Side::BUY,
            order_type: OrderType::MARKET,
            price: None,
            amount: Quantity::from_str("1.0").unwrap(),
        };
        let err = admission.submit(user, request, &queue).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sell_locks_base_amount() {
        let (admission, wallets, _) = setup();
        let user = UserId::new();
        wallets
            .credit(user, "BTC", WalletType::SPOT, Decimal::from(5))
            .unwrap();
        let (queue, _rx) = MarketQueue::new(8);

        let request = OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: Side::SELL,
            order_type: OrderType::LIMIT,
            price: Some(Price::from_u64(100)),
            amount: Quantity::from_str("1.5").unwrap(),
        };
        let order = admission.submit(user, request, &queue).unwrap();
        assert_eq!(order.locked_remaining, Decimal::new(15, 1));

        let wallet = wallets.get(&WalletKey::spot(user, "BTC")).unwrap();
        assert_eq!(wallet.frozen, Decimal::new(15, 1));
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_no_trace() {
        let (admission, wallets, orders) = setup();
        let user = UserId::new();
        wallets
            .credit(user, "USDT", WalletType::SPOT, Decimal::from(50))
            .unwrap();
        let (queue, mut rx) = MarketQueue::new(8);

        let err = admission
            .submit(user, limit_buy_request(100, "1.0"), &queue)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InsufficientBalance { .. }));

        let wallet = wallets.get(&WalletKey::spot(user, "USDT")).unwrap();
        assert_eq!(wallet.frozen, Decimal::ZERO);
        assert!(rx.try_recv().is_err());
        assert!(orders.resting_for_symbol(&MarketId::new("BTC/USDT")).is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let (admission, _, _) = setup();
        let (queue, _rx) = MarketQueue::new(8);
        let err = admission
            .submit(UserId::new(), limit_buy_request(100, "0"), &queue)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_limit_without_price_rejected() {
        let (admission, _, _) = setup();
        let (queue, _rx) = MarketQueue::new(8);
        let request = OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: Side::BUY,
            order_type: OrderType::LIMIT,
            price: None,
            amount: Quantity::from_str("1.0").unwrap(),
        };
        let err = admission
            .submit(UserId::new(), request, &queue)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_market_rejected() {
        let (admission, _, _) = setup();
        let (queue, _rx) = MarketQueue::new(8);
        let request = OrderRequest {
            symbol: "DOGE/USDT".to_string(),
            ..limit_buy_request(100, "1.0")
        };
        let err = admission
            .submit(UserId::new(), request, &queue)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::MarketNotFound { .. }));
    }

    #[tokio::test]
    async fn test_full_queue_rolls_back_lock_and_row() {
        let (admission, wallets, orders) = setup();
        let user = UserId::new();
        wallets
            .credit(user, "USDT", WalletType::SPOT, Decimal::from(1000))
            .unwrap();

        let (queue, _rx) = MarketQueue::new(1);
        admission
            .submit(user, limit_buy_request(100, "1.0"), &queue)
            .unwrap();
        // Second submission finds the queue full
        let err = admission
            .submit(user, limit_buy_request(100, "1.0"), &queue)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));

        // Only the first order's lock remains
        let wallet = wallets.get(&WalletKey::spot(user, "USDT")).unwrap();
        assert_eq!(wallet.frozen, Decimal::from(100));
        assert_eq!(orders.resting_for_symbol(&MarketId::new("BTC/USDT")).len(), 1);
    }
}

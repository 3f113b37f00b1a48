//! Trade settlement against the wallet ledger
//!
//! A settled trade mutates exactly four wallet rows: the buyer pays
//! `price × amount` from frozen quote and receives `amount` base; the seller
//! pays `amount` from frozen base and receives `price × amount` quote. The
//! four updates are computed on copies, validated, and only then written
//! back — a settlement that would leave any bucket negative persists nothing.

use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use types::errors::ExchangeError;
use types::numeric::{notional, Price, Quantity};
use types::order::{Order, Side};
use types::trade::Trade;
use types::wallet::{Wallet, WalletKey};

use crate::store::{MarketStore, TradeStore, WalletStore};

/// Executes trades: wallet transfers, trade row, sequence, fee
pub struct SettlementExecutor {
    sequence: AtomicU64,
    fee_rate: Decimal,
    wallets: Arc<WalletStore>,
    trades: Arc<TradeStore>,
    markets: Arc<MarketStore>,
}

impl SettlementExecutor {
    pub fn new(
        starting_sequence: u64,
        fee_rate: Decimal,
        wallets: Arc<WalletStore>,
        trades: Arc<TradeStore>,
        markets: Arc<MarketStore>,
    ) -> Self {
        Self {
            sequence: AtomicU64::new(starting_sequence),
            fee_rate,
            wallets,
            trades,
            markets,
        }
    }

    /// Next global monotonic trade sequence number
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Settle one match between a taker and a resting maker
    ///
    /// The execution price is always the maker's price. On success the trade
    /// row is appended, the market reference price updated, and the Trade
    /// returned; on failure no row is touched.
    pub fn settle(
        &self,
        taker: &Order,
        maker: &Order,
        base_asset: &str,
        quote_asset: &str,
        price: Price,
        amount: Quantity,
        timestamp: i64,
    ) -> Result<Trade, ExchangeError> {
        if taker.user_id == maker.user_id {
            return Err(ExchangeError::Conflict(
                "self-trade reached settlement".to_string(),
            ));
        }
        if amount.is_zero() {
            return Err(ExchangeError::Validation(
                "trade amount must be positive".to_string(),
            ));
        }

        let (buy_order, sell_order) = match taker.side {
            Side::BUY => (taker, maker),
            Side::SELL => (maker, taker),
        };
        let buyer = buy_order.user_id;
        let seller = sell_order.user_id;
        let value = notional(price, amount);

        let buyer_quote = WalletKey::spot(buyer, quote_asset);
        let buyer_base = WalletKey::spot(buyer, base_asset);
        let seller_base = WalletKey::spot(seller, base_asset);
        let seller_quote = WalletKey::spot(seller, quote_asset);

        self.transfer(
            &buyer_quote,
            &buyer_base,
            &seller_base,
            &seller_quote,
            value,
            amount.as_decimal(),
            timestamp,
        )?;

        let fee = value * self.fee_rate;
        let trade = Trade::new(
            self.next_sequence(),
            taker.symbol.clone(),
            buy_order.id,
            sell_order.id,
            buyer,
            seller,
            price,
            amount,
            fee,
            taker.side,
            timestamp,
        );

        self.trades.append(trade.clone());
        self.markets.set_reference_price(&trade.symbol, price);
        Ok(trade)
    }

    /// Apply the four wallet deltas atomically
    ///
    /// Rows are locked in canonical key order so settlements racing across
    /// markets cannot deadlock. Deltas are applied to copies and validated
    /// before anything is written back.
    #[allow(clippy::too_many_arguments)]
    fn transfer(
        &self,
        buyer_quote: &WalletKey,
        buyer_base: &WalletKey,
        seller_base: &WalletKey,
        seller_quote: &WalletKey,
        value: Decimal,
        amount: Decimal,
        timestamp: i64,
    ) -> Result<(), ExchangeError> {
        // Receiving rows are created on demand; a first-time trader has no
        // row for the currency they are about to receive. Payer rows hold
        // the admission lock and must already exist.
        self.wallets.ensure(buyer_base);
        self.wallets.ensure(seller_quote);

        let roles = [buyer_quote, buyer_base, seller_base, seller_quote];

        let mut keys: Vec<WalletKey> = roles.iter().map(|key| (*key).clone()).collect();
        keys.sort();
        keys.dedup();
        if keys.len() != 4 {
            return Err(ExchangeError::SettlementInvariant(
                "settlement requires four distinct wallet rows".to_string(),
            ));
        }

        let mut handles: Vec<(WalletKey, Arc<Mutex<Wallet>>)> = Vec::with_capacity(4);
        for key in &keys {
            let handle = self.wallets.handle(key).ok_or_else(|| {
                ExchangeError::WalletNotFound {
                    user_id: key.user_id.to_string(),
                    currency: key.currency.clone(),
                    wallet_type: format!("{:?}", key.wallet_type),
                }
            })?;
            handles.push((key.clone(), handle));
        }

        let mut guards: Vec<MutexGuard<'_, Wallet>> =
            handles.iter().map(|(_, handle)| handle.lock()).collect();

        let mut updated: Vec<Wallet> = guards.iter().map(|guard| (**guard).clone()).collect();
        let index = |key: &WalletKey| keys.iter().position(|k| k == key).unwrap();

        updated[index(buyer_quote)].frozen -= value;
        updated[index(buyer_base)].available += amount;
        updated[index(seller_base)].frozen -= amount;
        updated[index(seller_quote)].available += value;

        for wallet in &updated {
            if wallet.available < Decimal::ZERO || wallet.frozen < Decimal::ZERO {
                tracing::error!(
                    wallet = %wallet.id,
                    currency = %wallet.currency,
                    available = %wallet.available,
                    frozen = %wallet.frozen,
                    "settlement would leave wallet negative; aborting without persisting"
                );
                return Err(ExchangeError::SettlementInvariant(format!(
                    "wallet {} would go negative for {}",
                    wallet.id, wallet.currency
                )));
            }
        }

        for (guard, mut wallet) in guards.iter_mut().zip(updated.into_iter()) {
            wallet.recalculate(timestamp);
            debug_assert!(wallet.is_valid());
            **guard = wallet;
        }
        Ok(())
    }
}

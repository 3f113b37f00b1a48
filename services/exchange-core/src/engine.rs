//! Match engine
//!
//! One engine instance exists per market and is driven by that market's
//! single consumer task, so no two orders for the same symbol are ever
//! matched concurrently. The engine owns the book; order, trade, and wallet
//! rows live in the shared stores.
//!
//! The match pass walks the opposite side of the book best-first. A maker is
//! removed from the book before its trade settles, which reserves it against
//! any other consumption; if settlement fails the maker is restored to the
//! book with its original arrival sequence. A resting order owned by the
//! taker's user is never matched: it is explicitly canceled and its
//! remaining lock released.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use types::errors::ExchangeError;
use types::ids::OrderId;
use types::ids::UserId;
use types::market::Market;
use types::numeric::Quantity;
use types::order::{CancelReason, Order, OrderType, Side};
use types::time::now_nanos;
use types::wallet::WalletKey;

use crate::book::{MarketBook, RestingRef};
use crate::events::{EventBus, ExchangeEvent, OrderStatusChanged};
use crate::matching::crossing;
use crate::settlement::SettlementExecutor;
use crate::store::{OrderStore, WalletStore};

/// Per-market matching engine
pub struct MatchEngine {
    market: Market,
    book: MarketBook,
    arrival_seq: u64,
    orders: Arc<OrderStore>,
    wallets: Arc<WalletStore>,
    settlement: Arc<SettlementExecutor>,
    events: EventBus,
}

impl MatchEngine {
    pub fn new(
        market: Market,
        orders: Arc<OrderStore>,
        wallets: Arc<WalletStore>,
        settlement: Arc<SettlementExecutor>,
        events: EventBus,
    ) -> Self {
        Self {
            market,
            book: MarketBook::new(),
            arrival_seq: 0,
            orders,
            wallets,
            settlement,
            events,
        }
    }

    pub fn symbol(&self) -> &str {
        self.market.symbol.as_str()
    }

    /// Repopulate the book from non-terminal order rows
    ///
    /// Called once when the consumer starts; MARKET orders never rest and
    /// are skipped.
    pub fn rebuild(&mut self) {
        for order in self.orders.resting_for_symbol(&self.market.symbol) {
            if order.order_type == OrderType::MARKET {
                continue;
            }
            let Some(price) = order.price else { continue };
            let resting = RestingRef {
                order_id: order.id,
                user_id: order.user_id,
                price,
                arrival_seq: self.next_arrival(),
            };
            self.book.add(order.side, &resting);
        }
        tracing::info!(symbol = self.symbol(), "order book rebuilt");
    }

    fn next_arrival(&mut self) -> u64 {
        self.arrival_seq += 1;
        self.arrival_seq
    }

    /// The wallet the order's admission lock lives in
    fn funding_key(&self, order: &Order) -> WalletKey {
        match order.side {
            Side::BUY => WalletKey::spot(order.user_id, self.market.quote_asset.clone()),
            Side::SELL => WalletKey::spot(order.user_id, self.market.base_asset.clone()),
        }
    }

    fn emit_order(&self, order: &Order) {
        self.events.publish(ExchangeEvent::Order(OrderStatusChanged {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            filled: order.filled,
        }));
    }

    /// Run one match pass for a dequeued taker order
    ///
    /// Returns the unmatched remainder. LIMIT remainders rest in the book;
    /// MARKET remainders are discarded and their leftover lock released.
    pub fn process_submit(&mut self, order_id: OrderId) -> Result<Quantity, ExchangeError> {
        let Some(mut taker) = self.orders.get(&order_id) else {
            return Err(ExchangeError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        };
        if taker.status.is_terminal() {
            return Ok(taker.remaining());
        }

        let mut remaining = taker.remaining();

        while !remaining.is_zero() {
            let maker_side = taker.side.opposite();
            let Some(maker_ref) = self.book.peek_best(maker_side) else {
                break;
            };

            if maker_ref.user_id == taker.user_id {
                // Self-trade prevention: withdraw the resting order with an
                // explicit cancel so its lock is released, then keep matching
                self.book
                    .remove(maker_side, &maker_ref.order_id, maker_ref.price);
                if let Some(mut resting) = self.orders.get(&maker_ref.order_id) {
                    self.cancel_order_row(&mut resting, CancelReason::SelfTrade)?;
                }
                continue;
            }

            if !crossing::can_match(taker.side, taker.price, maker_ref.price) {
                break;
            }

            // Reserve the maker before settlement touches the ledger
            self.book
                .remove(maker_side, &maker_ref.order_id, maker_ref.price);
            let Some(mut maker) = self.orders.get(&maker_ref.order_id) else {
                tracing::warn!(
                    symbol = self.symbol(),
                    order_id = %maker_ref.order_id,
                    "book entry without a backing order row; dropping"
                );
                continue;
            };

            let mut matched = remaining.min(maker.remaining());
            if taker.order_type == OrderType::MARKET && taker.side == Side::BUY {
                // Spending is capped by the notional lock taken at admission;
                // truncate so matched × price can never exceed the lock
                let affordable = (taker.locked_remaining / maker_ref.price.as_decimal())
                    .round_dp_with_strategy(12, RoundingStrategy::ToZero);
                if affordable < matched.as_decimal() {
                    matched = Quantity::try_new(affordable).unwrap_or_else(Quantity::zero);
                }
            }
            if matched.is_zero() {
                self.book.add(maker_side, &maker_ref);
                break;
            }

            let now = now_nanos();
            let trade = match self.settlement.settle(
                &taker,
                &maker,
                &self.market.base_asset,
                &self.market.quote_asset,
                maker_ref.price,
                matched,
                now,
            ) {
                Ok(trade) => trade,
                Err(err) => {
                    // Never lose the maker: back into its original slot. The
                    // taker is parked like any unmatched remainder so it can
                    // still be matched or canceled, not stranded off-book.
                    self.book.add(maker_side, &maker_ref);
                    if let Err(park_err) = self.park_remainder(&mut taker, remaining) {
                        tracing::error!(
                            order_id = %taker.id,
                            %park_err,
                            "failed to park taker after settlement abort"
                        );
                    }
                    self.orders.update(&taker);
                    self.emit_order(&taker);
                    tracing::error!(
                        symbol = self.symbol(),
                        taker = %taker.id,
                        maker = %maker.id,
                        %err,
                        "settlement failed; maker restored to book"
                    );
                    return Err(err);
                }
            };
            self.events.publish(ExchangeEvent::Trade((&trade).into()));

            remaining = remaining.checked_sub(matched).unwrap_or_else(Quantity::zero);
            taker.add_fill(matched, now);
            maker.add_fill(matched, now);

            let value = trade.trade_value();
            taker.consume_lock(match taker.side {
                Side::BUY => value,
                Side::SELL => matched.as_decimal(),
            });
            maker.consume_lock(match maker.side {
                Side::BUY => value,
                Side::SELL => matched.as_decimal(),
            });

            // A LIMIT BUY filling below its limit leaves part of its lock
            // unspent; release the improvement immediately
            if taker.side == Side::BUY && taker.order_type == OrderType::LIMIT {
                if let Some(limit) = taker.price {
                    let improvement =
                        (limit.as_decimal() - maker_ref.price.as_decimal()) * matched.as_decimal();
                    if improvement > Decimal::ZERO {
                        self.wallets
                            .unlock_funds(&self.funding_key(&taker), improvement)?;
                        taker.consume_lock(improvement);
                    }
                }
            }

            if !maker.is_filled() {
                // Partial fill keeps the maker's original arrival sequence
                self.book.add(maker_side, &maker_ref);
            }
            self.orders.update(&maker);
            self.emit_order(&maker);
        }

        self.park_remainder(&mut taker, remaining)?;

        self.orders.update(&taker);
        self.emit_order(&taker);
        Ok(remaining)
    }

    /// Dispose of an unmatched remainder: LIMIT rests, MARKET true-ups
    fn park_remainder(
        &mut self,
        taker: &mut Order,
        remaining: Quantity,
    ) -> Result<(), ExchangeError> {
        match taker.order_type {
            OrderType::LIMIT if !remaining.is_zero() => {
                let resting = RestingRef {
                    order_id: taker.id,
                    user_id: taker.user_id,
                    price: taker.price.expect("limit orders carry a price"),
                    arrival_seq: self.next_arrival(),
                };
                self.book.add(taker.side, &resting);
            }
            OrderType::MARKET => {
                // The unexecuted remainder never rests; true-up the lock
                let leftover = taker.locked_remaining;
                if leftover > Decimal::ZERO {
                    self.wallets
                        .unlock_funds(&self.funding_key(taker), leftover)?;
                    taker.consume_lock(leftover);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Cancel an order inside the engine's serialization context
    ///
    /// Fails with Conflict (no side effects) when the order has already
    /// reached a terminal state — a benign race for callers.
    pub fn process_cancel(
        &mut self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), ExchangeError> {
        let Some(mut order) = self.orders.get(&order_id) else {
            return Err(ExchangeError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        };
        if order.user_id != user_id {
            return Err(ExchangeError::Conflict(
                "order belongs to another user".to_string(),
            ));
        }
        if order.status.is_terminal() {
            return Err(ExchangeError::Conflict(
                "order already filled or canceled".to_string(),
            ));
        }

        if let Some(price) = order.price {
            self.book.remove(order.side, &order.id, price);
        }
        self.cancel_order_row(&mut order, CancelReason::UserRequested)
    }

    /// Shared cancel path: release the remaining lock, persist, emit
    ///
    /// Only the not-yet-consumed portion of the admission lock is released;
    /// settled fills have already spent theirs.
    fn cancel_order_row(
        &mut self,
        order: &mut Order,
        reason: CancelReason,
    ) -> Result<(), ExchangeError> {
        let leftover = order.locked_remaining;
        if leftover > Decimal::ZERO {
            self.wallets
                .unlock_funds(&self.funding_key(order), leftover)?;
            order.consume_lock(leftover);
        }
        order.cancel(reason, now_nanos());
        self.orders.update(order);
        self.emit_order(order);
        Ok(())
    }

    /// Best bid and ask (diagnostics/tests)
    pub fn top_of_book(&self) -> (Option<types::numeric::Price>, Option<types::numeric::Price>) {
        self.book.top_of_book()
    }
}

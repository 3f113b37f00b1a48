//! Wallet rows and ledger primitives
//!
//! A wallet row holds the per-(user, currency, type) balances:
//! `available` (spendable), `frozen` (reserved against open orders), and the
//! derived `balance = available + frozen`. The ledger primitives are no-ops
//! with a logged warning when given a non-positive amount, and cap bucket
//! moves at the source bucket's current value.

use crate::ids::{UserId, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wallet type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum WalletType {
    /// Spot trading balances
    SPOT,
    /// Funding balances (deposits/withdrawals)
    FUNDING,
    /// Futures margin balances
    FUTURES,
}

/// Lookup key for a wallet row: one row exists per key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletKey {
    pub user_id: UserId,
    pub currency: String,
    pub wallet_type: WalletType,
}

impl WalletKey {
    pub fn spot(user_id: UserId, currency: impl Into<String>) -> Self {
        Self {
            user_id,
            currency: currency.into(),
            wallet_type: WalletType::SPOT,
        }
    }
}

/// A wallet row
///
/// Invariant: `available ≥ 0`, `frozen ≥ 0`, `balance = available + frozen`
/// at every observable point. `balance` is only written by `recalculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub currency: String,
    pub wallet_type: WalletType,
    pub available: Decimal,
    pub frozen: Decimal,
    pub balance: Decimal,
    pub updated_at: i64, // Unix nanos
    pub version: u64,
}

impl Wallet {
    /// Create an empty wallet row
    pub fn new(
        user_id: UserId,
        currency: impl Into<String>,
        wallet_type: WalletType,
        timestamp: i64,
    ) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            currency: currency.into(),
            wallet_type,
            available: Decimal::ZERO,
            frozen: Decimal::ZERO,
            balance: Decimal::ZERO,
            updated_at: timestamp,
            version: 0,
        }
    }

    /// The row's lookup key
    pub fn key(&self) -> WalletKey {
        WalletKey {
            user_id: self.user_id,
            currency: self.currency.clone(),
            wallet_type: self.wallet_type,
        }
    }

    /// Check the wallet invariant
    pub fn is_valid(&self) -> bool {
        self.available >= Decimal::ZERO
            && self.frozen >= Decimal::ZERO
            && self.balance == self.available + self.frozen
    }

    /// Reserve funds against an open order: available → frozen
    ///
    /// `available` is floored at zero; callers are expected to have verified
    /// sufficiency under the row lock, so an engaged floor is logged as a
    /// correctness signal.
    pub fn lock(&mut self, amount: Decimal, timestamp: i64) {
        if amount <= Decimal::ZERO {
            tracing::warn!(wallet = %self.id, %amount, "ignoring non-positive lock amount");
            return;
        }
        if amount > self.available {
            tracing::warn!(
                wallet = %self.id,
                %amount,
                available = %self.available,
                "lock exceeds available; flooring at zero"
            );
        }
        self.available = (self.available - amount).max(Decimal::ZERO);
        self.frozen += amount;
        self.recalculate(timestamp);
    }

    /// Release reserved funds: frozen → available, capped at `frozen`
    pub fn unlock(&mut self, amount: Decimal, timestamp: i64) {
        if amount <= Decimal::ZERO {
            tracing::warn!(wallet = %self.id, %amount, "ignoring non-positive unlock amount");
            return;
        }
        let moved = amount.min(self.frozen);
        self.frozen -= moved;
        self.available += moved;
        self.recalculate(timestamp);
    }

    /// Same-wallet bucket move: frozen → available, capped at `frozen`
    pub fn transfer_frozen_to_available(&mut self, amount: Decimal, timestamp: i64) {
        self.unlock(amount, timestamp);
    }

    /// Same-wallet bucket move: available → frozen, capped at `available`
    pub fn transfer_available_to_frozen(&mut self, amount: Decimal, timestamp: i64) {
        if amount <= Decimal::ZERO {
            tracing::warn!(wallet = %self.id, %amount, "ignoring non-positive transfer amount");
            return;
        }
        let moved = amount.min(self.available);
        self.available -= moved;
        self.frozen += moved;
        self.recalculate(timestamp);
    }

    /// Normalize both buckets to non-negative values and rederive `balance`
    ///
    /// A negative bucket can only come from a settlement bug; the clamp is
    /// logged at error severity for operator investigation.
    pub fn recalculate(&mut self, timestamp: i64) {
        if self.available < Decimal::ZERO || self.frozen < Decimal::ZERO {
            tracing::error!(
                wallet = %self.id,
                currency = %self.currency,
                available = %self.available,
                frozen = %self.frozen,
                "negative wallet bucket detected; clamping to zero"
            );
            self.available = self.available.max(Decimal::ZERO);
            self.frozen = self.frozen.max(Decimal::ZERO);
        }
        self.balance = self.available + self.frozen;
        self.updated_at = timestamp;
        self.version += 1;
    }
}

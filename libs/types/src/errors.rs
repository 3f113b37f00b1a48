//! Error taxonomy for the exchange core
//!
//! Admission-time errors surface synchronously to the caller before any
//! mutation; matching-time errors are logged and escalated internally,
//! never returned to the original submitter.

use thiserror::Error;

/// Top-level exchange error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// Bad request shape; rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Market not found: {symbol}")]
    MarketNotFound { symbol: String },

    #[error("Wallet not found: {currency} ({wallet_type}) for user {user_id}")]
    WalletNotFound {
        user_id: String,
        currency: String,
        wallet_type: String,
    },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("Insufficient balance for {currency}: required {required}, available {available}")]
    InsufficientBalance {
        currency: String,
        required: String,
        available: String,
    },

    /// State conflict (e.g. cancel on a non-cancelable order); no mutation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A settlement would leave a wallet negative; the in-flight settlement
    /// is aborted with no partial results persisted
    #[error("Settlement invariant violated: {0}")]
    SettlementInvariant(String),

    /// I/O failure to book/queue/ledger stores
    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = ExchangeError::Validation("amount must be positive".to_string());
        assert_eq!(err.to_string(), "Validation error: amount must be positive");
    }

    #[test]
    fn test_insufficient_balance_display() {
        let err = ExchangeError::InsufficientBalance {
            currency: "USDT".to_string(),
            required: "150".to_string(),
            available: "100".to_string(),
        };
        assert!(err.to_string().contains("USDT"));
        assert!(err.to_string().contains("150"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_market_not_found_display() {
        let err = ExchangeError::MarketNotFound {
            symbol: "DOGE/USDT".to_string(),
        };
        assert_eq!(err.to_string(), "Market not found: DOGE/USDT");
    }
}

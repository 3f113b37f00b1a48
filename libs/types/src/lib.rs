//! Types library for the spot exchange
//!
//! This library provides all core type definitions used across the exchange
//! system, ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, UserId, WalletId, MarketId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Trade record types
//! - `wallet`: Wallet rows and ledger primitives
//! - `market`: Market (currency pair) definitions
//! - `errors`: Error taxonomy
//! - `time`: Timestamp helpers

// Public modules
pub mod errors;
pub mod ids;
pub mod market;
pub mod numeric;
pub mod order;
pub mod time;
pub mod trade;
pub mod wallet;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::market::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::time::*;
    pub use crate::trade::*;
    pub use crate::wallet::*;
}

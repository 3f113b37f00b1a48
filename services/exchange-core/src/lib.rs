//! Spot exchange core
//!
//! Order admission, per-market FIFO command queues, price-time priority
//! order books, matching, and wallet-ledger settlement. One consumer task
//! per market serializes matching for that symbol; wallets settle under
//! per-row locks so independent markets trade concurrently.

pub mod admission;
pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod exchange;
pub mod matching;
pub mod queue;
pub mod settlement;
pub mod store;

pub use admission::{OrderAdmission, OrderRequest};
pub use config::ExchangeConfig;
pub use engine::MatchEngine;
pub use events::{EventBus, ExchangeEvent, OrderStatusChanged, TradeExecuted};
pub use exchange::Exchange;
pub use queue::{EngineCommand, MarketQueue};
pub use settlement::SettlementExecutor;
pub use store::{MarketStore, OrderStore, TradeStore, WalletStore};

//! Exchange configuration
//!
//! Defaults are suitable for tests; production deployments override through
//! `EXCHANGE_*` environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Flat taker fee rate recorded on each trade (no treasury transfer)
    pub fee_rate: Decimal,
    /// Headroom multiplier on the MARKET-buy notional lock cap
    pub market_buy_buffer: Decimal,
    /// Bound of each per-market command queue
    pub queue_depth: usize,
    /// Capacity of the outbound event broadcast channel
    pub event_capacity: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            fee_rate: Decimal::ZERO,
            market_buy_buffer: Decimal::new(5, 2), // 5%
            queue_depth: 1024,
            event_capacity: 4096,
        }
    }
}

impl ExchangeConfig {
    /// Defaults overridden by `EXCHANGE_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fee_rate: env_decimal("EXCHANGE_FEE_RATE", defaults.fee_rate),
            market_buy_buffer: env_decimal(
                "EXCHANGE_MARKET_BUY_BUFFER",
                defaults.market_buy_buffer,
            ),
            queue_depth: env_usize("EXCHANGE_QUEUE_DEPTH", defaults.queue_depth),
            event_capacity: env_usize("EXCHANGE_EVENT_CAPACITY", defaults.event_capacity),
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.fee_rate, Decimal::ZERO);
        assert_eq!(config.market_buy_buffer, Decimal::new(5, 2));
        assert!(config.queue_depth > 0);
    }
}

//! Pluggable SOL/USD price source.
//!
//! USD volume accounting needs a SOL price. There is no live price feed in
//! this system, so the conversion is a capability with a fixed-price default
//! rather than a constant buried in the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Source of the SOL price used for USD volume conversion.
pub trait PriceOracle: Send + Sync {
    /// Current SOL price in USD.
    fn sol_price_usd(&self) -> Decimal;
}

/// Oracle that always returns the same price.
#[derive(Debug, Clone)]
pub struct FixedPriceOracle {
    price: Decimal,
}

impl FixedPriceOracle {
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }
}

impl Default for FixedPriceOracle {
    /// The historical placeholder conversion rate.
    fn default() -> Self {
        Self { price: dec!(100) }
    }
}

impl PriceOracle for FixedPriceOracle {
    fn sol_price_usd(&self) -> Decimal {
        self.price
    }
}

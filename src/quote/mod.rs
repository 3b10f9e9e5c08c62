//! Swap-quote provider boundary.
//!
//! A [`QuoteProvider`] turns "swap X of mint A into mint B within this
//! slippage" into an output estimate, a price impact and an opaque
//! ready-to-submit transaction payload. The engine treats the provider as a
//! black box that may fail transiently; failures at this boundary are
//! absorbed as single-leg failures by the trade-pair runner.

mod jupiter;
mod simulated;

pub use jupiter::JupiterClient;
pub use simulated::SimulatedQuoteProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Request for one swap quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount in the input asset's base units (lamports for SOL)
    pub amount: u64,
    /// Slippage tolerance in basis points
    pub slippage_bps: u16,
}

/// Quote plus submittable instruction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Echo of the quoted input amount, base units
    pub input_amount: u64,
    /// Estimated output amount, base units
    pub output_amount: u64,
    /// Price impact of the swap, percent
    pub price_impact_pct: f64,
    /// Opaque serialized transaction ready for signing and submission
    pub swap_transaction: String,
}

/// Black-box swap-quote provider.
///
/// Implementations must be cheap to share: one instance is used read-only
/// across all job tasks.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Get a quote and a ready-to-submit transaction in one call.
    async fn quote_and_transaction(
        &self,
        request: &SwapQuoteRequest,
    ) -> Result<SwapQuote, QuoteError>;

    /// Whether a tradable market exists for the given mint.
    ///
    /// Consulted once during job setup; a `false` here fails the whole job
    /// before any trade runs.
    async fn has_tradable_market(&self, mint: &str) -> Result<bool, QuoteError>;
}

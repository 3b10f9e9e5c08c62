//! Deterministic quote provider for tests and offline runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use super::{QuoteProvider, SwapQuote, SwapQuoteRequest};
use crate::error::QuoteError;
use crate::model::SOL_MINT;

/// Simulated exchange rate: token base units received per lamport spent.
const TOKENS_PER_LAMPORT: f64 = 1_000.0;

/// Quote provider that fabricates plausible quotes locally.
///
/// Output amounts carry a small randomized spread, price impact scales with
/// trade size, and each call sleeps briefly to mimic provider latency.
/// Seedable so test runs are reproducible.
pub struct SimulatedQuoteProvider {
    rng: Mutex<SmallRng>,
    /// Half-spread applied to every conversion, e.g. 0.0025 = 25 bps
    spread: f64,
    /// Provider latency range
    latency: (Duration, Duration),
    /// Mints reported as having no tradable market
    dead_mints: Vec<String>,
}

impl SimulatedQuoteProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
            spread: 0.0025,
            latency: (Duration::from_millis(50), Duration::from_millis(250)),
            dead_mints: Vec::new(),
        }
    }

    /// Mark a mint as having no tradable pool. Setup against it fails.
    pub fn with_dead_mint(mut self, mint: impl Into<String>) -> Self {
        self.dead_mints.push(mint.into());
        self
    }

    fn sample(&self) -> (f64, f64, Duration) {
        let mut rng = self.rng.lock();
        let slip = rng.gen_range(0.0..self.spread * 2.0);
        let impact = rng.gen_range(0.01..0.3);
        let latency_ms =
            rng.gen_range(self.latency.0.as_millis() as u64..=self.latency.1.as_millis() as u64);
        (slip, impact, Duration::from_millis(latency_ms))
    }
}

#[async_trait]
impl QuoteProvider for SimulatedQuoteProvider {
    async fn quote_and_transaction(
        &self,
        request: &SwapQuoteRequest,
    ) -> Result<SwapQuote, QuoteError> {
        if self.dead_mints.contains(&request.output_mint)
            || self.dead_mints.contains(&request.input_mint)
        {
            let mint = if request.input_mint == SOL_MINT {
                request.output_mint.clone()
            } else {
                request.input_mint.clone()
            };
            return Err(QuoteError::NoRoute(mint));
        }

        let (slip, impact, latency) = self.sample();
        tokio::time::sleep(latency).await;

        let rate = if request.input_mint == SOL_MINT {
            TOKENS_PER_LAMPORT
        } else {
            1.0 / TOKENS_PER_LAMPORT
        };
        let output = (request.amount as f64 * rate * (1.0 - slip)).floor() as u64;

        Ok(SwapQuote {
            input_amount: request.amount,
            output_amount: output,
            price_impact_pct: impact,
            swap_transaction: format!("sim-swap:{}:{}", request.output_mint, request.amount),
        })
    }

    async fn has_tradable_market(&self, mint: &str) -> Result<bool, QuoteError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(!self.dead_mints.iter().any(|m| m == mint))
    }
}

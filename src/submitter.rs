//! Trade submission capability.
//!
//! Signing, broadcasting and confirming the swap transaction is abstracted
//! behind [`TradeSubmitter`] so the execution loop is identical whether it
//! talks to a real ledger or to the simulation. Only the simulated
//! implementation ships here; a real submitter would sign the quote's
//! payload and confirm it on chain.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::error::SubmitError;
use crate::model::TradeLeg;
use crate::quote::SwapQuote;

/// Result of one confirmed submission.
#[derive(Debug, Clone)]
pub struct SubmittedTrade {
    /// Transaction reference (signature on a real ledger)
    pub signature: String,
    /// Fee paid, in SOL
    pub fee: Decimal,
    /// Effective execution price in USD
    pub executed_price: Decimal,
}

/// Capability to submit a quoted swap for execution.
#[async_trait]
pub trait TradeSubmitter: Send + Sync {
    async fn submit(&self, quote: &SwapQuote, leg: TradeLeg) -> Result<SubmittedTrade, SubmitError>;
}

/// Knobs for the simulated submitter.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Probability that a submission is rejected, per leg
    pub failure_rate: f64,
    /// Confirmation latency bounds
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Fee bounds per swap, in SOL
    pub min_fee: f64,
    pub max_fee: f64,
    /// Base execution price in USD around which fills vary +-2%
    pub base_price: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.02,
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(2_000),
            min_fee: 0.001,
            max_fee: 0.003,
            base_price: 100.0,
        }
    }
}

const SIGNATURE_ALPHABET: &[u8] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const SIGNATURE_LEN: usize = 88;

const FAILURE_REASONS: [&str; 4] = [
    "slippage exceeded",
    "insufficient liquidity",
    "network congestion",
    "priority fee too low",
];

/// Submitter that fabricates confirmations without touching a ledger.
pub struct SimulatedSubmitter {
    config: SimulationConfig,
    rng: Mutex<SmallRng>,
}

impl SimulatedSubmitter {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, SimulationConfig::default())
    }

    pub fn with_config(seed: u64, config: SimulationConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// A submitter that never injects synthetic failures.
    pub fn reliable(seed: u64) -> Self {
        Self::with_config(
            seed,
            SimulationConfig {
                failure_rate: 0.0,
                ..SimulationConfig::default()
            },
        )
    }

    fn roll(&self) -> (bool, usize, Duration, f64, f64, String) {
        let mut rng = self.rng.lock();
        let fail = rng.gen_bool(self.config.failure_rate);
        let reason_idx = rng.gen_range(0..FAILURE_REASONS.len());
        let latency_ms = rng.gen_range(
            self.config.min_latency.as_millis() as u64..=self.config.max_latency.as_millis() as u64,
        );
        let fee = rng.gen_range(self.config.min_fee..self.config.max_fee);
        let price = self.config.base_price * (1.0 + rng.gen_range(-0.02..0.02));
        let signature: String = (0..SIGNATURE_LEN)
            .map(|_| SIGNATURE_ALPHABET[rng.gen_range(0..SIGNATURE_ALPHABET.len())] as char)
            .collect();
        (
            fail,
            reason_idx,
            Duration::from_millis(latency_ms),
            fee,
            price,
            signature,
        )
    }
}

#[async_trait]
impl TradeSubmitter for SimulatedSubmitter {
    async fn submit(
        &self,
        _quote: &SwapQuote,
        _leg: TradeLeg,
    ) -> Result<SubmittedTrade, SubmitError> {
        let (fail, reason_idx, latency, fee, price, signature) = self.roll();
        tokio::time::sleep(latency).await;

        if fail {
            return Err(SubmitError::Rejected(FAILURE_REASONS[reason_idx].into()));
        }

        Ok(SubmittedTrade {
            signature,
            fee: Decimal::from_f64(fee).unwrap_or(Decimal::ZERO),
            executed_price: Decimal::from_f64(price).unwrap_or(Decimal::ZERO),
        })
    }
}

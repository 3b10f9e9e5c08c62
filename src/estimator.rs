//! Pre-flight volume estimation.
//!
//! Answers "what would this campaign generate and cost" without executing
//! anything. The spread loss comes from a live round-trip quote probe when
//! the provider cooperates, and from a conservative fallback assumption when
//! it does not; an estimate is always produced for valid parameters.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineResult;
use crate::model::{LAMPORTS_PER_SOL, SOL_MINT};
use crate::oracle::PriceOracle;
use crate::pacing::{base_delay_secs, Strategy};
use crate::quote::{QuoteProvider, SwapQuoteRequest};

/// Round-trip loss assumed when the quote probe fails, percent.
const FALLBACK_LOSS_PCT: f64 = 0.5;

/// Swap fee assumption: 20 bps of the trade size per leg.
const FEE_RATE: Decimal = dec!(0.002);

/// Network gas per swap, lamports.
const GAS_LAMPORTS: u64 = 5_000;

/// Input for a volume estimate; a subset of the execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub token_mint: String,
    pub num_trades: u32,
    pub duration_minutes: u32,
    pub trade_size_sol: Decimal,
    pub slippage_bps: u16,
    pub strategy: Strategy,
}

/// Projected volume and cost of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeEstimate {
    /// Notional moved across all legs, in SOL: `2 × size × trades`
    pub total_volume_sol: Decimal,
    /// The same notional converted through the oracle
    pub total_volume_usd: Decimal,
    /// Spread + impact loss per round trip, percent
    pub round_trip_loss_pct: f64,
    /// Swap fees plus gas across the whole campaign, in SOL
    pub estimated_fees_sol: Decimal,
    /// Fees plus cumulative round-trip loss, in SOL
    pub estimated_cost_sol: Decimal,
    /// Mean pause between trade pairs, seconds
    pub average_delay_secs: f64,
    /// True when the loss figure is the fallback assumption, not a probe
    pub used_fallback: bool,
}

/// Estimate the volume and cost of a campaign via a round-trip quote probe.
pub async fn estimate_volume(
    quotes: &dyn QuoteProvider,
    oracle: &dyn PriceOracle,
    request: &EstimateRequest,
) -> EngineResult<VolumeEstimate> {
    let base_delay = base_delay_secs(
        f64::from(request.duration_minutes) * 60.0,
        request.num_trades,
    )?;
    let (lo, hi) = request.strategy.delay_bounds();
    let average_delay_secs = base_delay * (lo + hi) / 2.0;

    let (round_trip_loss_pct, used_fallback) = match probe_round_trip(quotes, request).await {
        Ok(loss) => (loss, false),
        Err(e) => {
            debug!(error = %e, "quote probe failed, using fallback loss assumption");
            (FALLBACK_LOSS_PCT, true)
        }
    };

    let trades = Decimal::from(request.num_trades);
    let total_volume_sol = request.trade_size_sol * dec!(2) * trades;
    let total_volume_usd = total_volume_sol * oracle.sol_price_usd();

    let gas_per_swap = Decimal::from(GAS_LAMPORTS) / Decimal::from(LAMPORTS_PER_SOL);
    let fees_per_pair = (request.trade_size_sol * FEE_RATE + gas_per_swap) * dec!(2);
    let estimated_fees_sol = fees_per_pair * trades;

    let loss_per_pair = request.trade_size_sol
        * Decimal::from_f64(round_trip_loss_pct / 100.0).unwrap_or(Decimal::ZERO);
    let estimated_cost_sol = estimated_fees_sol + loss_per_pair * trades;

    Ok(VolumeEstimate {
        total_volume_sol,
        total_volume_usd,
        round_trip_loss_pct,
        estimated_fees_sol,
        estimated_cost_sol,
        average_delay_secs,
        used_fallback,
    })
}

/// Quote a buy and the matching sell, and measure what a round trip loses.
async fn probe_round_trip(
    quotes: &dyn QuoteProvider,
    request: &EstimateRequest,
) -> Result<f64, crate::error::QuoteError> {
    let lamports = (request.trade_size_sol * Decimal::from(LAMPORTS_PER_SOL))
        .to_u64()
        .unwrap_or(0);

    let buy = quotes
        .quote_and_transaction(&SwapQuoteRequest {
            input_mint: SOL_MINT.to_string(),
            output_mint: request.token_mint.clone(),
            amount: lamports,
            slippage_bps: request.slippage_bps,
        })
        .await?;
    let sell = quotes
        .quote_and_transaction(&SwapQuoteRequest {
            input_mint: request.token_mint.clone(),
            output_mint: SOL_MINT.to_string(),
            amount: buy.output_amount,
            slippage_bps: request.slippage_bps,
        })
        .await?;

    if lamports == 0 {
        return Ok(0.0);
    }
    let lost = lamports.saturating_sub(sell.output_amount) as f64;
    Ok(lost / lamports as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FixedPriceOracle;
    use crate::quote::SimulatedQuoteProvider;

    fn request(mint: &str) -> EstimateRequest {
        EstimateRequest {
            token_mint: mint.to_string(),
            num_trades: 10,
            duration_minutes: 10,
            trade_size_sol: dec!(0.1),
            slippage_bps: 50,
            strategy: Strategy::Balanced,
        }
    }

    #[tokio::test]
    async fn probe_drives_the_loss_figure() {
        let quotes = SimulatedQuoteProvider::new(42);
        let oracle = FixedPriceOracle::default();
        let estimate = estimate_volume(&quotes, &oracle, &request("Mint"))
            .await
            .unwrap();

        assert!(!estimate.used_fallback);
        assert!(estimate.round_trip_loss_pct >= 0.0);
        assert_eq!(estimate.total_volume_sol, dec!(2));
        assert_eq!(estimate.total_volume_usd, dec!(200));
        assert!(estimate.estimated_fees_sol > Decimal::ZERO);
        assert!(estimate.estimated_cost_sol >= estimate.estimated_fees_sol);
        assert_eq!(estimate.average_delay_secs, 60.0);
    }

    #[tokio::test]
    async fn provider_error_falls_back_cleanly() {
        let quotes = SimulatedQuoteProvider::new(1).with_dead_mint("DeadMint");
        let oracle = FixedPriceOracle::default();
        let estimate = estimate_volume(&quotes, &oracle, &request("DeadMint"))
            .await
            .unwrap();

        assert!(estimate.used_fallback);
        assert_eq!(estimate.round_trip_loss_pct, FALLBACK_LOSS_PCT);
    }

    #[tokio::test]
    async fn zero_trades_is_rejected() {
        let quotes = SimulatedQuoteProvider::new(1);
        let oracle = FixedPriceOracle::default();
        let mut req = request("Mint");
        req.num_trades = 0;
        assert!(estimate_volume(&quotes, &oracle, &req).await.is_err());
    }
}

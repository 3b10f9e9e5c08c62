//! Trade-pair runner: one buy leg, a short pause, one sell leg.
//!
//! A pair is the unit of work the execution loop schedules. The runner never
//! returns an error: quote and submission failures are absorbed into the
//! [`TradePairOutcome`] so the loop can fold them into the job's counters and
//! keep going. Every attempted leg leaves exactly one history entry.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::history::TradeHistoryLog;
use crate::model::{
    ExecutionParams, JobId, LegResult, LegStatus, TradeHistoryEntry, TradeLeg, TradePairOutcome,
    LAMPORTS_PER_SOL, SOL_MINT,
};
use crate::quote::{QuoteProvider, SwapQuoteRequest};
use crate::submitter::TradeSubmitter;

/// Pause between the buy and the sell legs, seconds.
const INTER_LEG_DELAY_SECS: (f64, f64) = (2.0, 5.0);

/// Executes buy+sell pairs against the quote provider and submitter.
pub struct TradePairRunner {
    quotes: Arc<dyn QuoteProvider>,
    submitter: Arc<dyn TradeSubmitter>,
    history: Arc<TradeHistoryLog>,
    rng: Mutex<SmallRng>,
}

impl TradePairRunner {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        submitter: Arc<dyn TradeSubmitter>,
        history: Arc<TradeHistoryLog>,
        seed: u64,
    ) -> Self {
        Self {
            quotes,
            submitter,
            history,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Run one buy+sell pair.
    ///
    /// The sell uses the buy's realized output, so the wallet's token
    /// position is flat after a complete pair. If the buy fails the sell is
    /// skipped. Cancellation shortens the inter-leg pause but never skips the
    /// sell once the buy has landed; the position is always unwound.
    pub async fn run_pair(
        &self,
        job_id: &JobId,
        params: &ExecutionParams,
        pair_index: u32,
        size_multiplier: f64,
        cancel: &mut watch::Receiver<bool>,
    ) -> TradePairOutcome {
        let lamports = (params.trade_size_lamports() as f64 * size_multiplier) as u64;
        let sol_amount = lamports_to_sol(lamports);

        let buy = self
            .execute_leg(job_id, params, TradeLeg::Buy, lamports, sol_amount)
            .await;

        if !buy.success {
            debug!(%job_id, pair_index, reason = ?buy.failure_reason, "buy leg failed, skipping sell");
            return TradePairOutcome {
                pair_index,
                buy,
                sell: None,
            };
        }

        let pause = {
            let mut rng = self.rng.lock();
            Duration::from_secs_f64(rng.gen_range(INTER_LEG_DELAY_SECS.0..INTER_LEG_DELAY_SECS.1))
        };
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = cancel.changed() => {
                debug!(%job_id, pair_index, "cancel observed mid-pair, unwinding immediately");
            }
        }

        // The amount column is denominated in SOL; a round trip is
        // symmetric up to spread, so the sell record mirrors the buy size.
        let sell = self
            .execute_leg(job_id, params, TradeLeg::Sell, buy.output_amount, sol_amount)
            .await;

        TradePairOutcome {
            pair_index,
            buy,
            sell: Some(sell),
        }
    }

    /// Quote, submit and record one leg. Failures come back as an
    /// unsuccessful [`LegResult`] rather than an error.
    async fn execute_leg(
        &self,
        job_id: &JobId,
        params: &ExecutionParams,
        leg: TradeLeg,
        amount: u64,
        sol_amount: Decimal,
    ) -> LegResult {
        let request = match leg {
            TradeLeg::Buy => SwapQuoteRequest {
                input_mint: SOL_MINT.to_string(),
                output_mint: params.token_mint.clone(),
                amount,
                slippage_bps: params.slippage_bps,
            },
            TradeLeg::Sell => SwapQuoteRequest {
                input_mint: params.token_mint.clone(),
                output_mint: SOL_MINT.to_string(),
                amount,
                slippage_bps: params.slippage_bps,
            },
        };

        let result = match self.quotes.quote_and_transaction(&request).await {
            Ok(quote) => match self.submitter.submit(&quote, leg).await {
                Ok(trade) => LegResult {
                    leg,
                    success: true,
                    output_amount: quote.output_amount,
                    fee: trade.fee,
                    price_impact_pct: quote.price_impact_pct,
                    signature: Some(trade.signature),
                    failure_reason: None,
                },
                Err(e) => {
                    warn!(%job_id, %leg, error = %e, "submission failed");
                    LegResult::failed(leg, e.to_string())
                }
            },
            Err(e) => {
                warn!(%job_id, %leg, error = %e, "quote failed");
                LegResult::failed(leg, e.to_string())
            }
        };

        self.history.append(TradeHistoryEntry {
            job_id: job_id.clone(),
            timestamp: chrono::Utc::now(),
            token_mint: params.token_mint.clone(),
            leg,
            amount: sol_amount,
            fee: result.fee,
            status: if result.success {
                LegStatus::Confirmed
            } else {
                LegStatus::Failed
            },
            signature: result.signature.clone(),
        });

        result
    }
}

fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

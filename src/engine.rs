//! Execution engine: job registry, lifecycle transitions and the per-job
//! trade loop.
//!
//! One tokio task per active job. Only that task mutates the job's counters
//! (single-writer); every external caller works off snapshots taken under a
//! brief read lock. Cancellation is cooperative through a per-job watch
//! channel, observed at the top of every iteration and inside both sleeps.

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::broadcast::{BroadcastStats, ProgressEvent, ProgressEventKind, SubscriberId};
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::history::HistoryPage;
use crate::model::{
    ExecutionParams, ExecutionSummary, Job, JobId, JobSnapshot, JobStatus, StartReceipt,
};
use crate::pacing::trending::{calculate_parameters, TrendingConfig, TrendingIntensity};
use crate::pacing::{base_delay_secs, sample_delay_secs, Strategy};
use crate::runner::TradePairRunner;

/// Wallet must hold this multiple of the trade size before a job starts;
/// covers the buy leg plus fees and slippage across the whole run.
const BALANCE_HEADROOM: Decimal = dec!(2.1);

const MAX_TRADES: u32 = 10_000;
const MAX_DURATION_MINUTES: u32 = 1_440;
const MAX_SLIPPAGE_BPS: u16 = 5_000;

/// Registry entry: the job state plus its cancel signal.
struct JobHandle {
    job: RwLock<Job>,
    cancel: watch::Sender<bool>,
}

/// Orchestrates timed buy/sell campaigns against the context's providers.
pub struct ExecutionEngine {
    ctx: EngineContext,
    jobs: DashMap<JobId, Arc<JobHandle>>,
    summaries: Arc<RwLock<Vec<ExecutionSummary>>>,
    /// Seed source for per-job RNGs; monotone so concurrent jobs diverge.
    next_seed: AtomicU64,
}

impl ExecutionEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self::with_seed(ctx, rand::random())
    }

    /// Engine whose stochastic behavior is reproducible across runs.
    pub fn with_seed(ctx: EngineContext, seed: u64) -> Self {
        Self {
            ctx,
            jobs: DashMap::new(),
            summaries: Arc::new(RwLock::new(Vec::new())),
            next_seed: AtomicU64::new(seed),
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Validate, check the wallet balance, register the job and spawn its
    /// loop task. Returns without waiting for any trade.
    ///
    /// An insufficient balance is not an `Err`: the caller gets a receipt
    /// with `Failed` status and no job is registered.
    pub async fn start_execution(&self, params: ExecutionParams) -> EngineResult<StartReceipt> {
        validate_params(&params)?;

        let required = params.trade_size_sol * BALANCE_HEADROOM;
        let available = self
            .ctx
            .balances
            .available_balance(&params.wallet_pubkey)
            .await?;
        if available < required {
            warn!(
                wallet = %params.wallet_pubkey,
                %required,
                %available,
                "rejecting execution: balance below round-trip requirement"
            );
            return Ok(StartReceipt {
                job_id: JobId::generate(),
                status: JobStatus::Failed,
                message: format!(
                    "insufficient balance: required {required} SOL, available {available} SOL"
                ),
                estimated_completion: None,
            });
        }

        let id = JobId::generate();
        let job = Job::new(id.clone(), params);
        let estimated_completion = job.estimated_completion;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = Arc::new(JobHandle {
            job: RwLock::new(job),
            cancel: cancel_tx,
        });
        self.jobs.insert(id.clone(), Arc::clone(&handle));

        let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
        let driver = JobDriver {
            ctx: self.ctx.clone(),
            summaries: Arc::clone(&self.summaries),
        };
        tokio::spawn(async move {
            driver.drive(handle, cancel_rx, seed).await;
        });

        info!(job_id = %id, "execution job registered");
        Ok(StartReceipt {
            job_id: id,
            status: JobStatus::Pending,
            message: "execution started".to_string(),
            estimated_completion: Some(estimated_completion),
        })
    }

    /// Derive execution parameters from a trending campaign config and start
    /// the job. Trade size comes from the platform-adjusted USD size via the
    /// oracle; high-visibility intensities run the tighter pacing strategy
    /// and carry the burst plan.
    pub async fn start_trending_execution(
        &self,
        wallet_pubkey: impl Into<String>,
        token_mint: impl Into<String>,
        config: TrendingConfig,
        slippage_bps: u16,
    ) -> EngineResult<StartReceipt> {
        let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
        let mut rng = SmallRng::seed_from_u64(seed);
        let derived = calculate_parameters(&config, Utc::now(), &mut rng)?;

        let sol_price = self.ctx.oracle.sol_price_usd();
        if sol_price <= Decimal::ZERO {
            return Err(EngineError::Setup(
                "oracle returned a non-positive SOL price".to_string(),
            ));
        }
        let trade_size_sol = Decimal::from_f64(derived.average_trade_size_usd)
            .unwrap_or(Decimal::ZERO)
            / sol_price;

        let strategy = match config.intensity {
            TrendingIntensity::Organic | TrendingIntensity::Stealth => Strategy::Organic,
            TrendingIntensity::Aggressive | TrendingIntensity::Viral => Strategy::Aggressive,
        };

        let params = ExecutionParams {
            wallet_pubkey: wallet_pubkey.into(),
            token_mint: token_mint.into(),
            num_trades: derived.target_transactions,
            duration_minutes: derived.plan.window_minutes.round() as u32,
            trade_size_sol,
            slippage_bps,
            strategy,
            trending_plan: Some(derived.plan),
        };
        info!(
            platform = %config.platform,
            intensity = %config.intensity,
            num_trades = params.num_trades,
            %trade_size_sol,
            "starting trending execution"
        );
        self.start_execution(params).await
    }

    /// Request cancellation of a running job.
    ///
    /// The job is marked `Cancelled` immediately; its task observes the
    /// signal at the next checkpoint, unwinds any open position and emits
    /// the terminal event. Unknown and already-terminal jobs are `NotFound`.
    pub fn stop_execution(&self, job_id: &JobId) -> EngineResult<bool> {
        let handle = self
            .jobs
            .get(job_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| EngineError::not_found(job_id.as_str()))?;

        {
            let mut job = handle.job.write();
            if job.status.is_terminal() {
                return Err(EngineError::not_found(job_id.as_str()));
            }
            job.status = JobStatus::Cancelled;
            job.ended_at = Some(Utc::now());
        }
        // Receiver may already be gone if the task just finished; the
        // status write above still stands.
        let _ = handle.cancel.send(true);
        info!(%job_id, "cancellation requested");
        Ok(true)
    }

    /// Snapshot of one job. Brief read lock; never blocks the loop.
    pub fn get_status(&self, job_id: &JobId) -> EngineResult<JobSnapshot> {
        self.jobs
            .get(job_id)
            .map(|e| e.value().job.read().snapshot())
            .ok_or_else(|| EngineError::not_found(job_id.as_str()))
    }

    /// Snapshots of all non-terminal jobs.
    pub fn list_active(&self) -> Vec<JobSnapshot> {
        self.jobs
            .iter()
            .map(|e| e.value().job.read().snapshot())
            .filter(|s| s.status.is_active())
            .collect()
    }

    /// Summaries of every finished job, in completion order.
    pub fn get_summaries(&self) -> Vec<ExecutionSummary> {
        self.summaries.read().clone()
    }

    /// Page through the trade history, optionally filtered by job.
    pub fn get_history(
        &self,
        job_filter: Option<&JobId>,
        page: usize,
        page_size: usize,
    ) -> HistoryPage {
        self.ctx.history.query(job_filter, page, page_size)
    }

    pub fn subscribe_job(&self, job_id: &JobId) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        self.ctx.broadcaster.subscribe_job(job_id)
    }

    pub fn subscribe_global(&self) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        self.ctx.broadcaster.subscribe_global()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.ctx.broadcaster.unsubscribe(id);
    }

    pub fn broadcast_stats(&self) -> BroadcastStats {
        self.ctx.broadcaster.stats()
    }
}

/// The slice of engine state a job task needs; cloned into the task so the
/// engine itself is never captured.
struct JobDriver {
    ctx: EngineContext,
    summaries: Arc<RwLock<Vec<ExecutionSummary>>>,
}

impl JobDriver {
    /// The per-job loop. One iteration = one trade pair.
    async fn drive(&self, handle: Arc<JobHandle>, mut cancel: watch::Receiver<bool>, seed: u64) {
        let (job_id, params) = {
            let job = handle.job.read();
            (job.id.clone(), job.params.clone())
        };

        // Setup: the token must have a tradable market before any leg runs.
        match self.ctx.quotes.has_tradable_market(&params.token_mint).await {
            Ok(true) => {}
            Ok(false) => {
                self.finish_failed(
                    &handle,
                    &job_id,
                    format!("no tradable market for mint {}", params.token_mint),
                );
                return;
            }
            Err(e) => {
                self.finish_failed(&handle, &job_id, format!("market check failed: {e}"));
                return;
            }
        }

        {
            let mut job = handle.job.write();
            if job.status.is_terminal() {
                // Cancelled while still in setup.
                drop(job);
                self.push_summary(&handle);
                self.publish_status(&job_id, JobStatus::Cancelled, "execution cancelled");
                return;
            }
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
        self.publish_status(&job_id, JobStatus::Running, "execution running");
        // Monotonic loop clock; tracks the runtime's (possibly paused) time
        // source, unlike the wall-clock timestamps on the job itself.
        let loop_started = tokio::time::Instant::now();

        let runner = TradePairRunner::new(
            Arc::clone(&self.ctx.quotes),
            Arc::clone(&self.ctx.submitter),
            Arc::clone(&self.ctx.history),
            seed,
        );
        let mut rng = SmallRng::seed_from_u64(seed.wrapping_mul(0x9e3779b97f4a7c15));
        // num_trades >= 1 was validated at start, so this cannot fail.
        let base_delay = match base_delay_secs(params.total_duration_secs(), params.num_trades) {
            Ok(base) => base,
            Err(e) => {
                self.finish_failed(&handle, &job_id, e.to_string());
                return;
            }
        };
        let sol_price = self.ctx.oracle.sol_price_usd();

        let mut delays_total = 0.0;

        for pair_index in 1..=params.num_trades {
            if *cancel.borrow() {
                break;
            }

            // Burst windows scale both trade size and cadence while active.
            let elapsed_minutes = loop_started.elapsed().as_secs_f64() / 60.0;
            let burst = params
                .trending_plan
                .as_ref()
                .and_then(|plan| plan.burst_at(elapsed_minutes));
            let size_mult = burst.map_or(1.0, |b| b.trade_size_multiplier);
            let freq_mult = burst.map_or(1.0, |b| b.frequency_multiplier);

            let delay = sample_delay_secs(base_delay, params.strategy, &mut rng) / freq_mult;
            delays_total += delay;

            let outcome = runner
                .run_pair(&job_id, &params, pair_index, size_mult, &mut cancel)
                .await;

            let snapshot = {
                let mut job = handle.job.write();
                // A pair only counts once its buy leg landed; a failed buy
                // skips straight to the next iteration's accounting.
                if outcome.buy.success {
                    job.trades_completed += 1;
                    // Each successful leg moves trade_size worth of notional.
                    let pair_volume = Decimal::from(outcome.successful_legs())
                        * params.trade_size_sol
                        * sol_price;
                    job.volume_generated += pair_volume;
                }
                job.successful_legs += outcome.successful_legs();
                job.failed_legs += outcome.failed_legs();
                job.fees_spent += outcome.total_fees();
                job.snapshot()
            };

            let mean_delay = delays_total / f64::from(pair_index);
            let remaining = params.num_trades - pair_index;
            let eta_secs = (f64::from(remaining) * mean_delay).round() as u64;
            debug!(
                %job_id,
                pair_index,
                progress_pct = snapshot.progress_pct,
                eta_secs,
                "trade pair finished"
            );

            self.ctx.broadcaster.publish(ProgressEvent::new(
                job_id.clone(),
                ProgressEventKind::TradeCompleted {
                    pair_index,
                    total_trades: params.num_trades,
                    trades_completed: snapshot.trades_completed,
                    progress_pct: snapshot.progress_pct,
                    volume_generated: snapshot.volume_generated,
                    fees_spent: snapshot.fees_spent,
                    estimated_remaining_secs: eta_secs,
                    outcome,
                },
            ));

            if pair_index < params.num_trades {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
                    _ = cancel.changed() => {
                        if *cancel.borrow() {
                            break;
                        }
                    }
                }
            }
        }

        // The terminal transition is decided under the job lock: a
        // cancellation that landed at any point (stop_execution writes the
        // status before signalling) is never overwritten by Completed. The
        // loop task owns the terminal event so it is always last.
        let final_status = {
            let mut job = handle.job.write();
            if !job.status.is_terminal() {
                job.status = JobStatus::Completed;
                job.ended_at = Some(Utc::now());
            }
            job.status
        };
        self.push_summary(&handle);
        if final_status == JobStatus::Completed {
            self.publish_status(&job_id, final_status, "execution completed");
            info!(%job_id, "execution completed");
        } else {
            self.publish_status(&job_id, final_status, "execution cancelled");
            info!(%job_id, "execution cancelled");
        }
    }

    /// Terminal `Failed` transition: record the message, push the summary,
    /// emit the error event and then the terminal status event.
    fn finish_failed(&self, handle: &Arc<JobHandle>, job_id: &JobId, message: String) {
        let status = {
            let mut job = handle.job.write();
            if !job.status.is_terminal() {
                job.status = JobStatus::Failed;
                job.error_message = Some(message.clone());
                job.ended_at = Some(Utc::now());
            }
            job.status
        };
        warn!(%job_id, %message, "execution failed");
        self.push_summary(handle);
        if status == JobStatus::Failed {
            self.ctx.broadcaster.publish(ProgressEvent::new(
                job_id.clone(),
                ProgressEventKind::Error {
                    error: message.clone(),
                    details: None,
                },
            ));
        }
        self.publish_status(job_id, status, message);
    }

    fn push_summary(&self, handle: &Arc<JobHandle>) {
        let summary = handle.job.read().summary();
        self.summaries.write().push(summary);
    }

    fn publish_status(&self, job_id: &JobId, status: JobStatus, message: impl Into<String>) {
        self.ctx.broadcaster.publish(ProgressEvent::new(
            job_id.clone(),
            ProgressEventKind::StatusChanged {
                status,
                message: message.into(),
            },
        ));
    }
}

fn validate_params(params: &ExecutionParams) -> EngineResult<()> {
    if params.wallet_pubkey.trim().is_empty() {
        return Err(EngineError::invalid("wallet_pubkey", "must not be empty"));
    }
    if params.token_mint.trim().is_empty() {
        return Err(EngineError::invalid("token_mint", "must not be empty"));
    }
    if params.num_trades == 0 {
        return Err(EngineError::invalid("num_trades", "must be at least 1"));
    }
    if params.num_trades > MAX_TRADES {
        return Err(EngineError::invalid(
            "num_trades",
            format!("must be at most {MAX_TRADES}"),
        ));
    }
    if params.duration_minutes == 0 {
        return Err(EngineError::invalid(
            "duration_minutes",
            "must be at least 1",
        ));
    }
    if params.duration_minutes > MAX_DURATION_MINUTES {
        return Err(EngineError::invalid(
            "duration_minutes",
            format!("must be at most {MAX_DURATION_MINUTES}"),
        ));
    }
    if params.trade_size_sol <= Decimal::ZERO {
        return Err(EngineError::invalid("trade_size_sol", "must be positive"));
    }
    if params.slippage_bps > MAX_SLIPPAGE_BPS {
        return Err(EngineError::invalid(
            "slippage_bps",
            format!("must be at most {MAX_SLIPPAGE_BPS}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ExecutionParams {
        ExecutionParams {
            wallet_pubkey: "WaLLet1111111111111111111111111111111111111".to_string(),
            token_mint: "TokenMint111111111111111111111111111111111".to_string(),
            num_trades: 5,
            duration_minutes: 2,
            trade_size_sol: dec!(0.05),
            slippage_bps: 50,
            strategy: Strategy::Balanced,
            trending_plan: None,
        }
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let ok = params();
        assert!(validate_params(&ok).is_ok());

        let mut p = params();
        p.wallet_pubkey = "  ".to_string();
        assert!(matches!(
            validate_params(&p).unwrap_err(),
            EngineError::InvalidParameters { field: "wallet_pubkey", .. }
        ));

        let mut p = params();
        p.num_trades = 0;
        assert!(validate_params(&p).is_err());

        let mut p = params();
        p.duration_minutes = MAX_DURATION_MINUTES + 1;
        assert!(validate_params(&p).is_err());

        let mut p = params();
        p.trade_size_sol = Decimal::ZERO;
        assert!(validate_params(&p).is_err());

        let mut p = params();
        p.slippage_bps = MAX_SLIPPAGE_BPS + 1;
        assert!(validate_params(&p).is_err());
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let engine = ExecutionEngine::with_seed(EngineContext::simulated(1), 1);
        let missing = JobId::generate();
        assert!(matches!(
            engine.get_status(&missing).unwrap_err(),
            EngineError::NotFound { .. }
        ));
        assert!(matches!(
            engine.stop_execution(&missing).unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }
}

//! Core domain types: jobs, snapshots, trade outcomes, history entries.
//!
//! A [`Job`] is one execution of a timed trade-pair sequence. It is mutated
//! exclusively by its own loop task (single-writer); everything external
//! reads [`JobSnapshot`] copies.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pacing::trending::TrendingPlan;
use crate::pacing::Strategy;

/// Wrapped SOL mint address, the quote-side asset of every pair.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Unique identifier for one execution job. Generated, never caller-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job.
///
/// `Pending → Running → {Completed, Failed, Cancelled}`. Terminal states
/// never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Completed, Failed and Cancelled are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Immutable input parameters for one execution job.
///
/// Range validation happens in `ExecutionEngine::start_execution`; once a
/// job exists its params never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Wallet funding the trades
    pub wallet_pubkey: String,
    /// Target token mint
    pub token_mint: String,
    /// Number of buy+sell pairs to execute
    pub num_trades: u32,
    /// Total campaign duration in minutes
    pub duration_minutes: u32,
    /// Size of each buy leg in SOL
    pub trade_size_sol: Decimal,
    /// Slippage tolerance in basis points
    pub slippage_bps: u16,
    /// Pacing strategy for inter-pair delays
    pub strategy: Strategy,
    /// Optional trending burst plan; present for trending-mode jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trending_plan: Option<TrendingPlan>,
}

impl ExecutionParams {
    /// Total duration in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        f64::from(self.duration_minutes) * 60.0
    }

    /// Buy-leg amount in lamports.
    pub fn trade_size_lamports(&self) -> u64 {
        (self.trade_size_sol * Decimal::from(LAMPORTS_PER_SOL))
            .to_u64()
            .unwrap_or(0)
    }
}

/// One half of a trade pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeLeg {
    Buy,
    Sell,
}

impl fmt::Display for TradeLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeLeg::Buy => "buy",
            TradeLeg::Sell => "sell",
        })
    }
}

/// Outcome of a single leg inside a trade pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegResult {
    pub leg: TradeLeg,
    pub success: bool,
    /// Realized output amount in the output asset's base units
    pub output_amount: u64,
    /// Fee paid, in SOL
    pub fee: Decimal,
    /// Price impact reported by the quote provider, percent
    pub price_impact_pct: f64,
    /// Opaque transaction reference (absent for failed legs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Failure reason for failed legs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl LegResult {
    pub fn failed(leg: TradeLeg, reason: impl Into<String>) -> Self {
        LegResult {
            leg,
            success: false,
            output_amount: 0,
            fee: Decimal::ZERO,
            price_impact_pct: 0.0,
            signature: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Ephemeral result of one buy+sell cycle.
///
/// Folded into the job's counters and emitted as an event; not retained
/// beyond the per-leg history entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePairOutcome {
    pub pair_index: u32,
    pub buy: LegResult,
    /// Absent when the buy leg failed and the sell was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell: Option<LegResult>,
}

impl TradePairOutcome {
    /// Both legs succeeded.
    pub fn is_complete(&self) -> bool {
        self.buy.success && self.sell.as_ref().is_some_and(|s| s.success)
    }

    /// Total fees across both legs, in SOL.
    pub fn total_fees(&self) -> Decimal {
        self.buy.fee + self.sell.as_ref().map(|s| s.fee).unwrap_or(Decimal::ZERO)
    }

    /// Count of successful legs in this pair (0..=2).
    pub fn successful_legs(&self) -> u32 {
        u32::from(self.buy.success) + self.sell.as_ref().map_or(0, |s| u32::from(s.success))
    }

    /// Count of failed legs in this pair.
    pub fn failed_legs(&self) -> u32 {
        u32::from(!self.buy.success) + self.sell.as_ref().map_or(0, |s| u32::from(!s.success))
    }
}

/// Final status of one recorded leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Confirmed,
    Failed,
}

/// Append-only record of one executed (or attempted) leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHistoryEntry {
    pub job_id: JobId,
    pub timestamp: DateTime<Utc>,
    pub token_mint: String,
    pub leg: TradeLeg,
    /// Trade amount in SOL
    pub amount: Decimal,
    /// Fee paid in SOL
    pub fee: Decimal,
    pub status: LegStatus,
    /// Opaque transaction reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Registry-internal job state. Counters only ever increase; mutated
/// exclusively by the job's own loop task.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub params: ExecutionParams,
    pub status: JobStatus,
    pub trades_completed: u32,
    /// USD volume generated so far
    pub volume_generated: Decimal,
    /// Fees spent so far, in SOL
    pub fees_spent: Decimal,
    pub successful_legs: u32,
    pub failed_legs: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub estimated_completion: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl Job {
    /// Create a new job in `Pending` with zeroed counters.
    pub fn new(id: JobId, params: ExecutionParams) -> Self {
        let now = Utc::now();
        let estimated_completion =
            now + chrono::Duration::minutes(i64::from(params.duration_minutes));
        Job {
            id,
            params,
            status: JobStatus::Pending,
            trades_completed: 0,
            volume_generated: Decimal::ZERO,
            fees_spent: Decimal::ZERO,
            successful_legs: 0,
            failed_legs: 0,
            created_at: now,
            started_at: None,
            ended_at: None,
            estimated_completion,
            error_message: None,
        }
    }

    /// Exact progress percentage: `100 × trades_completed / num_trades`.
    pub fn progress_pct(&self) -> f64 {
        if self.params.num_trades == 0 {
            return 0.0;
        }
        f64::from(self.trades_completed) / f64::from(self.params.num_trades) * 100.0
    }

    /// Read-model copy for status queries and events.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            status: self.status,
            progress_pct: self.progress_pct(),
            trades_completed: self.trades_completed,
            total_trades: self.params.num_trades,
            volume_generated: self.volume_generated,
            fees_spent: self.fees_spent,
            successful_legs: self.successful_legs,
            failed_legs: self.failed_legs,
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            estimated_completion: self.estimated_completion,
            error_message: self.error_message.clone(),
        }
    }

    /// Immutable summary produced once at the terminal transition.
    pub fn summary(&self) -> ExecutionSummary {
        let efficiency = if self.params.num_trades == 0 {
            0.0
        } else {
            f64::from(self.trades_completed) / f64::from(self.params.num_trades)
        };
        ExecutionSummary {
            job_id: self.id.clone(),
            wallet_pubkey: self.params.wallet_pubkey.clone(),
            token_mint: self.params.token_mint.clone(),
            start_time: self.started_at.unwrap_or(self.created_at),
            end_time: self.ended_at.unwrap_or_else(Utc::now),
            status: self.status,
            trades_completed: self.trades_completed,
            total_volume: self.volume_generated,
            total_fees: self.fees_spent,
            efficiency,
        }
    }
}

/// Point-in-time view of a job, computed without blocking its loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_pct: f64,
    pub trades_completed: u32,
    pub total_trades: u32,
    pub volume_generated: Decimal,
    pub fees_spent: Decimal,
    pub successful_legs: u32,
    pub failed_legs: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub estimated_completion: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Final record of one finished (or failed/cancelled) execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub job_id: JobId,
    pub wallet_pubkey: String,
    pub token_mint: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: JobStatus,
    pub trades_completed: u32,
    pub total_volume: Decimal,
    pub total_fees: Decimal,
    /// `trades_completed / num_trades` in `[0, 1]`
    pub efficiency: f64,
}

/// Response returned by `start_execution` without waiting for the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartReceipt {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> ExecutionParams {
        ExecutionParams {
            wallet_pubkey: "WaLLet1111111111111111111111111111111111111".to_string(),
            token_mint: "TokenMint111111111111111111111111111111111".to_string(),
            num_trades: 8,
            duration_minutes: 4,
            trade_size_sol: dec!(0.05),
            slippage_bps: 50,
            strategy: Strategy::Balanced,
            trending_plan: None,
        }
    }

    #[test]
    fn status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn progress_is_exact() {
        let mut job = Job::new(JobId::generate(), params());
        assert_eq!(job.progress_pct(), 0.0);
        job.trades_completed = 2;
        assert_eq!(job.progress_pct(), 25.0);
        job.trades_completed = 8;
        assert_eq!(job.progress_pct(), 100.0);
    }

    #[test]
    fn trade_size_lamports_conversion() {
        let p = params();
        assert_eq!(p.trade_size_lamports(), 50_000_000);
    }

    #[test]
    fn summary_efficiency() {
        let mut job = Job::new(JobId::generate(), params());
        job.trades_completed = 6;
        job.status = JobStatus::Cancelled;
        let summary = job.summary();
        assert_eq!(summary.efficiency, 0.75);
        assert_eq!(summary.status, JobStatus::Cancelled);
    }

    #[test]
    fn pair_outcome_leg_counts() {
        let outcome = TradePairOutcome {
            pair_index: 1,
            buy: LegResult {
                leg: TradeLeg::Buy,
                success: true,
                output_amount: 1000,
                fee: dec!(0.001),
                price_impact_pct: 0.1,
                signature: Some("sig".to_string()),
                failure_reason: None,
            },
            sell: Some(LegResult::failed(TradeLeg::Sell, "slippage exceeded")),
        };
        assert!(!outcome.is_complete());
        assert_eq!(outcome.successful_legs(), 1);
        assert_eq!(outcome.failed_legs(), 1);
        assert_eq!(outcome.total_fees(), dec!(0.001));
    }
}

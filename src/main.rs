//! Demo binary: runs one fully simulated volume campaign end to end and
//! prints its progress events, summary and recorded history.

use anyhow::Result;
use clap::Parser;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use volume_engine::broadcast::ProgressEventKind;
use volume_engine::logging::{init_logging, LogConfig};
use volume_engine::model::ExecutionParams;
use volume_engine::pacing::Strategy;
use volume_engine::{EngineContext, ExecutionEngine};

#[derive(Parser)]
#[command(
    name = "volume-engine",
    about = "Run a simulated timed buy/sell volume campaign",
    version
)]
struct Cli {
    /// Wallet funding the trades
    #[arg(long, default_value = "DemoWa11et111111111111111111111111111111111")]
    wallet: String,

    /// Target token mint
    #[arg(long, default_value = "DemoMint11111111111111111111111111111111111")]
    mint: String,

    /// Number of buy+sell pairs
    #[arg(long, default_value_t = 5)]
    trades: u32,

    /// Campaign duration in minutes
    #[arg(long, default_value_t = 1)]
    duration: u32,

    /// Buy-leg size in SOL
    #[arg(long, default_value = "0.05")]
    size: Decimal,

    /// Slippage tolerance in basis points
    #[arg(long, default_value_t = 50)]
    slippage_bps: u16,

    /// Pacing strategy: balanced, aggressive or organic
    #[arg(long, default_value = "balanced")]
    strategy: Strategy,

    /// Seed for the simulated providers
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LogConfig::from_env()).map_err(|e| anyhow::anyhow!(e))?;
    let cli = Cli::parse();

    let ctx = EngineContext::simulated(cli.seed);
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, cli.seed));

    let receipt = engine
        .start_execution(ExecutionParams {
            wallet_pubkey: cli.wallet,
            token_mint: cli.mint,
            num_trades: cli.trades,
            duration_minutes: cli.duration,
            trade_size_sol: cli.size,
            slippage_bps: cli.slippage_bps,
            strategy: cli.strategy,
            trending_plan: None,
        })
        .await?;
    println!("job {}: {} ({})", receipt.job_id, receipt.status, receipt.message);
    if receipt.status.is_terminal() {
        // Rejected before a job was registered (e.g. insufficient balance).
        return Ok(());
    }

    let job_id = receipt.job_id;
    let (sub_id, mut events) = engine.subscribe_job(&job_id);
    loop {
        // The subscription races the job task's first events, so fall back
        // to polling the snapshot if the terminal event was missed.
        match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Some(event)) => match &event.kind {
                ProgressEventKind::TradeCompleted {
                    pair_index,
                    total_trades,
                    progress_pct,
                    volume_generated,
                    fees_spent,
                    ..
                } => println!(
                    "  pair {pair_index}/{total_trades} ({progress_pct:.1}%)  \
                     volume {volume_generated:.2} USD  fees {fees_spent:.6} SOL"
                ),
                ProgressEventKind::StatusChanged { status, message } => {
                    println!("  status -> {status}: {message}");
                    if status.is_terminal() {
                        break;
                    }
                }
                ProgressEventKind::Error { error, .. } => eprintln!("  error: {error}"),
            },
            Ok(None) => break,
            Err(_) => {
                if engine.get_status(&job_id)?.status.is_terminal() {
                    break;
                }
            }
        }
    }
    engine.unsubscribe(sub_id);

    for summary in engine.get_summaries() {
        println!(
            "summary: {} trades, {:.2} USD volume, {:.6} SOL fees, efficiency {:.0}%",
            summary.trades_completed,
            summary.total_volume,
            summary.total_fees,
            summary.efficiency * 100.0
        );
    }
    let history = engine.get_history(None, 1, 100);
    println!("{} legs recorded", history.total);

    Ok(())
}

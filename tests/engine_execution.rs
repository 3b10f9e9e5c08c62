//! End-to-end engine scenarios against the fully simulated context.
//!
//! All tests run under a paused clock; the virtual time auto-advances
//! through the pacing sleeps so multi-minute campaigns finish instantly.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use volume_engine::balance::StaticBalances;
use volume_engine::broadcast::ProgressEventKind;
use volume_engine::error::EngineError;
use volume_engine::model::{ExecutionParams, JobId, JobStatus};
use volume_engine::oracle::FixedPriceOracle;
use volume_engine::pacing::trending::{
    BurstWindow, TrendingConfig, TrendingIntensity, TrendingPlan, TrendingPlatform,
};
use volume_engine::pacing::Strategy;
use volume_engine::quote::SimulatedQuoteProvider;
use volume_engine::submitter::{SimulatedSubmitter, SimulationConfig};
use volume_engine::{EngineContext, ExecutionEngine};

fn params(num_trades: u32, duration_minutes: u32) -> ExecutionParams {
    ExecutionParams {
        wallet_pubkey: "WaLLet1111111111111111111111111111111111111".to_string(),
        token_mint: "TokenMint111111111111111111111111111111111".to_string(),
        num_trades,
        duration_minutes,
        trade_size_sol: dec!(0.05),
        slippage_bps: 50,
        strategy: Strategy::Balanced,
        trending_plan: None,
    }
}

fn reliable_engine(seed: u64) -> Arc<ExecutionEngine> {
    Arc::new(ExecutionEngine::with_seed(
        EngineContext::simulated_reliable(seed),
        seed,
    ))
}

/// Poll until the job's task has fully exited (its summary is pushed).
async fn wait_for_summaries(engine: &Arc<ExecutionEngine>, count: usize) {
    while engine.get_summaries().len() < count {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn completed_job_runs_every_pair_and_records_history() {
    let engine = reliable_engine(7);
    let receipt = engine.start_execution(params(5, 1)).await.unwrap();
    assert_eq!(receipt.status, JobStatus::Pending);
    assert!(receipt.estimated_completion.is_some());

    wait_for_summaries(&engine, 1).await;

    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.trades_completed, 5);
    assert_eq!(snapshot.progress_pct, 100.0);
    assert_eq!(snapshot.successful_legs, 10);
    assert_eq!(snapshot.failed_legs, 0);
    // 2 legs × 0.05 SOL × 100 USD per pair, five pairs.
    assert_eq!(snapshot.volume_generated, dec!(50));
    // Per-leg fees are bounded by the simulation config.
    assert!(snapshot.fees_spent >= dec!(0.01));
    assert!(snapshot.fees_spent <= dec!(0.03));

    let history = engine.get_history(Some(&receipt.job_id), 1, 50);
    assert_eq!(history.total, 10);
    assert!(history.entries.iter().all(|e| e.fee >= Decimal::ZERO));

    let summaries = engine.get_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].status, JobStatus::Completed);
    assert_eq!(summaries[0].efficiency, 1.0);
}

#[tokio::test(start_paused = true)]
async fn insufficient_balance_rejects_without_registering_a_job() {
    let ctx = EngineContext::new(
        Arc::new(SimulatedQuoteProvider::new(3)),
        Arc::new(SimulatedSubmitter::reliable(4)),
        Arc::new(StaticBalances::new(dec!(0.05))),
        Arc::new(FixedPriceOracle::default()),
    );
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, 3));

    let receipt = engine.start_execution(params(5, 1)).await.unwrap();
    assert_eq!(receipt.status, JobStatus::Failed);
    assert!(receipt.message.contains("insufficient balance"));
    assert!(receipt.estimated_completion.is_none());

    // No job, no task, no history.
    assert!(matches!(
        engine.get_status(&receipt.job_id),
        Err(EngineError::NotFound { .. })
    ));
    assert!(engine.list_active().is_empty());
    assert_eq!(engine.get_history(None, 1, 10).total, 0);
    assert!(engine.get_summaries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_params_are_rejected_synchronously() {
    let engine = reliable_engine(1);

    let mut bad = params(5, 1);
    bad.num_trades = 0;
    assert!(matches!(
        engine.start_execution(bad).await.unwrap_err(),
        EngineError::InvalidParameters { field: "num_trades", .. }
    ));

    let mut bad = params(5, 1);
    bad.trade_size_sol = dec!(-1);
    assert!(engine.start_execution(bad).await.is_err());

    assert!(engine.list_active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_permanent_and_partial() {
    let engine = reliable_engine(21);
    // Long campaign so the cancel lands mid-run.
    let receipt = engine.start_execution(params(50, 30)).await.unwrap();
    let job_id = receipt.job_id.clone();

    // Let a couple of pairs through first.
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert!(engine.stop_execution(&job_id).unwrap());

    let snapshot = engine.get_status(&job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Cancelled);

    wait_for_summaries(&engine, 1).await;

    // Still cancelled once the task has drained, and stopped early.
    let snapshot = engine.get_status(&job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert!(snapshot.trades_completed < 50);

    let summaries = engine.get_summaries();
    assert_eq!(summaries[0].status, JobStatus::Cancelled);
    assert!(summaries[0].efficiency < 1.0);

    // A second stop is NotFound: the job is already terminal.
    assert!(matches!(
        engine.stop_execution(&job_id),
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn progress_events_are_exact_and_terminal_event_is_last() {
    let engine = reliable_engine(13);
    let receipt = engine.start_execution(params(4, 1)).await.unwrap();
    let (sub_id, mut events) = engine.subscribe_job(&receipt.job_id);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let terminal = matches!(
            event.kind,
            ProgressEventKind::StatusChanged { status, .. } if status.is_terminal()
        );
        seen.push(event);
        if terminal {
            break;
        }
    }
    engine.unsubscribe(sub_id);

    let progress: Vec<f64> = seen
        .iter()
        .filter_map(|e| match &e.kind {
            ProgressEventKind::TradeCompleted { progress_pct, .. } => Some(*progress_pct),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![25.0, 50.0, 75.0, 100.0]);

    // Nothing after the terminal status event.
    match &seen.last().unwrap().kind {
        ProgressEventKind::StatusChanged { status, .. } => {
            assert_eq!(*status, JobStatus::Completed)
        }
        other => panic!("expected terminal status event, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn dead_market_fails_the_job_with_an_error_event() {
    let ctx = EngineContext::new(
        Arc::new(SimulatedQuoteProvider::new(5).with_dead_mint("DeadMint111111111111111111111111111111111")),
        Arc::new(SimulatedSubmitter::reliable(6)),
        Arc::new(StaticBalances::new(dec!(10))),
        Arc::new(FixedPriceOracle::default()),
    );
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, 5));

    let mut p = params(5, 1);
    p.token_mint = "DeadMint111111111111111111111111111111111".to_string();
    let receipt = engine.start_execution(p).await.unwrap();
    let (sub_id, mut events) = engine.subscribe_job(&receipt.job_id);

    wait_for_summaries(&engine, 1).await;

    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Failed);
    assert!(snapshot
        .error_message
        .as_deref()
        .unwrap()
        .contains("no tradable market"));
    assert_eq!(snapshot.trades_completed, 0);
    assert_eq!(engine.get_history(None, 1, 10).total, 0);

    // Error event precedes the terminal Failed status event.
    let first = events.recv().await.unwrap();
    assert!(matches!(first.kind, ProgressEventKind::Error { .. }));
    let second = events.recv().await.unwrap();
    assert!(matches!(
        second.kind,
        ProgressEventKind::StatusChanged { status: JobStatus::Failed, .. }
    ));
    engine.unsubscribe(sub_id);
}

#[tokio::test(start_paused = true)]
async fn trending_execution_derives_its_parameters() {
    let ctx = EngineContext::new(
        Arc::new(SimulatedQuoteProvider::new(9)),
        Arc::new(SimulatedSubmitter::reliable(10)),
        Arc::new(StaticBalances::new(dec!(100))),
        Arc::new(FixedPriceOracle::default()),
    );
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, 9));

    // 1000 USD over 5 txs = 200 USD/trade, exactly solscan's optimum.
    let config = TrendingConfig {
        platform: TrendingPlatform::Solscan,
        intensity: TrendingIntensity::Organic,
        target_volume_24h: 1_000.0,
        target_transactions: 5,
        price_impact_tolerance: 2.0,
        time_window_hours: 1,
        use_multiple_wallets: false,
        include_failed_txs: false,
    };
    let receipt = engine
        .start_trending_execution(
            "WaLLet1111111111111111111111111111111111111",
            "TokenMint111111111111111111111111111111111",
            config,
            50,
        )
        .await
        .unwrap();
    assert_eq!(receipt.status, JobStatus::Pending);

    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.total_trades, 5);

    wait_for_summaries(&engine, 1).await;
    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.trades_completed, 5);
    // 200 USD per leg at the fixed 100 USD oracle price.
    assert_eq!(snapshot.volume_generated, dec!(2000));
}

#[tokio::test(start_paused = true)]
async fn trending_config_validation_propagates() {
    let engine = reliable_engine(2);
    let config = TrendingConfig {
        platform: TrendingPlatform::Dexscreener,
        intensity: TrendingIntensity::Viral,
        target_volume_24h: 0.0,
        target_transactions: 10,
        price_impact_tolerance: 2.0,
        time_window_hours: 6,
        use_multiple_wallets: false,
        include_failed_txs: false,
    };
    assert!(matches!(
        engine
            .start_trending_execution("w", "m", config, 50)
            .await
            .unwrap_err(),
        EngineError::InvalidParameters { field: "target_volume_24h", .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_jobs_are_tracked_independently() {
    let engine = reliable_engine(31);
    let a = engine.start_execution(params(3, 1)).await.unwrap();
    let b = engine.start_execution(params(6, 2)).await.unwrap();
    assert_ne!(a.job_id, b.job_id);

    wait_for_summaries(&engine, 2).await;

    let snap_a = engine.get_status(&a.job_id).unwrap();
    let snap_b = engine.get_status(&b.job_id).unwrap();
    assert_eq!(snap_a.trades_completed, 3);
    assert_eq!(snap_b.trades_completed, 6);
    assert!(engine.list_active().is_empty());

    assert_eq!(engine.get_history(Some(&a.job_id), 1, 50).total, 6);
    assert_eq!(engine.get_history(Some(&b.job_id), 1, 50).total, 12);
    assert_eq!(engine.get_history(None, 1, 50).total, 18);
}

#[tokio::test(start_paused = true)]
async fn rejected_buys_do_not_count_as_completed_trades() {
    let ctx = EngineContext::new(
        Arc::new(SimulatedQuoteProvider::new(17)),
        Arc::new(SimulatedSubmitter::with_config(
            18,
            SimulationConfig {
                failure_rate: 1.0,
                ..SimulationConfig::default()
            },
        )),
        Arc::new(StaticBalances::new(dec!(10))),
        Arc::new(FixedPriceOracle::default()),
    );
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, 17));

    let receipt = engine.start_execution(params(3, 1)).await.unwrap();
    wait_for_summaries(&engine, 1).await;

    // Every buy was rejected; the loop ran to the end but nothing counts
    // as a completed trade.
    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.trades_completed, 0);
    assert_eq!(snapshot.progress_pct, 0.0);
    assert_eq!(snapshot.volume_generated, Decimal::ZERO);
    assert_eq!(snapshot.successful_legs, 0);
    assert_eq!(snapshot.failed_legs, 3);

    // One failed buy entry per pair; no sells were attempted.
    assert_eq!(engine.get_history(Some(&receipt.job_id), 1, 10).total, 3);

    let summaries = engine.get_summaries();
    assert_eq!(summaries[0].trades_completed, 0);
    assert_eq!(summaries[0].efficiency, 0.0);
    assert_eq!(summaries[0].total_volume, Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn burst_window_scales_trade_size_and_cadence() {
    let engine = reliable_engine(23);
    let mut p = params(4, 2);
    // One burst covering the whole run: bigger trades, much tighter cadence.
    p.trending_plan = Some(TrendingPlan {
        window_minutes: 2.0,
        bursts: vec![BurstWindow {
            start_offset_minutes: 0.0,
            duration_minutes: 2.0,
            intensity_multiplier: 2.0,
            trade_size_multiplier: 1.6,
            frequency_multiplier: 10.0,
        }],
    });

    let started = tokio::time::Instant::now();
    let receipt = engine.start_execution(p).await.unwrap();
    let (sub_id, mut events) = engine.subscribe_job(&receipt.job_id);
    while let Some(event) = events.recv().await {
        if matches!(
            event.kind,
            ProgressEventKind::StatusChanged { status, .. } if status.is_terminal()
        ) {
            break;
        }
    }
    engine.unsubscribe(sub_id);
    let elapsed = started.elapsed();

    // Size multiplier: every leg traded 0.05 × 1.6 = 0.08 SOL.
    let history = engine.get_history(Some(&receipt.job_id), 1, 50);
    assert_eq!(history.total, 8);
    assert!(history.entries.iter().all(|e| e.amount == dec!(0.08)));

    // Frequency multiplier: base delay is 30 s per pair, so without the
    // burst the three inter-pair sleeps alone take over a minute of
    // virtual time; at 10x cadence the whole run fits well under it.
    assert!(
        elapsed < Duration::from_secs(60),
        "burst cadence not applied, run took {elapsed:?}"
    );

    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.trades_completed, 4);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_final_pair_never_reports_completed() {
    let engine = reliable_engine(29);
    let receipt = engine.start_execution(params(1, 1)).await.unwrap();
    let job_id = receipt.job_id.clone();
    let (sub_id, mut events) = engine.subscribe_job(&job_id);

    // The only pair takes at least ~3 s of legs and pause; cancel while it
    // is still in flight, after which the loop has nothing left to run.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(engine.stop_execution(&job_id).unwrap());

    wait_for_summaries(&engine, 1).await;

    // The open position was unwound and the pair counted, but the terminal
    // state stays Cancelled; completion never overwrites it.
    let snapshot = engine.get_status(&job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert_eq!(snapshot.trades_completed, 1);
    assert_eq!(engine.get_summaries()[0].status, JobStatus::Cancelled);

    let mut terminal = None;
    while let Ok(event) = events.try_recv() {
        if let ProgressEventKind::StatusChanged { status, .. } = event.kind {
            if status.is_terminal() {
                terminal = Some(status);
            }
        }
    }
    engine.unsubscribe(sub_id);
    assert_eq!(terminal, Some(JobStatus::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn setup_failure_keeps_the_cancellation_timestamp() {
    let ctx = EngineContext::new(
        Arc::new(
            SimulatedQuoteProvider::new(19)
                .with_dead_mint("DeadMint111111111111111111111111111111111"),
        ),
        Arc::new(SimulatedSubmitter::reliable(20)),
        Arc::new(StaticBalances::new(dec!(10))),
        Arc::new(FixedPriceOracle::default()),
    );
    let engine = Arc::new(ExecutionEngine::with_seed(ctx, 19));

    let mut p = params(5, 1);
    p.token_mint = "DeadMint111111111111111111111111111111111".to_string();
    let receipt = engine.start_execution(p).await.unwrap();

    // Cancel before the task has run its market check.
    assert!(engine.stop_execution(&receipt.job_id).unwrap());
    let cancelled_at = engine.get_status(&receipt.job_id).unwrap().ended_at;
    assert!(cancelled_at.is_some());

    wait_for_summaries(&engine, 1).await;

    // The failed market check does not rewrite the terminal state the
    // cancellation already recorded.
    let snapshot = engine.get_status(&receipt.job_id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert_eq!(snapshot.ended_at, cancelled_at);
    assert!(snapshot.error_message.is_none());
    assert_eq!(engine.get_summaries()[0].status, JobStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn unknown_job_queries_are_not_found() {
    let engine = reliable_engine(1);
    let missing = JobId::generate();
    assert!(matches!(
        engine.get_status(&missing),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        engine.stop_execution(&missing),
        Err(EngineError::NotFound { .. })
    ));
}

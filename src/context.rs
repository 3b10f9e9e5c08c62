//! Engine dependency container.
//!
//! Every collaborator the engine touches comes in through [`EngineContext`];
//! there are no globals. Swapping the simulated pieces for real ones is a
//! matter of constructing a different context.

use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::balance::{BalanceProvider, StaticBalances};
use crate::broadcast::ProgressBroadcaster;
use crate::history::TradeHistoryLog;
use crate::oracle::{FixedPriceOracle, PriceOracle};
use crate::quote::{QuoteProvider, SimulatedQuoteProvider};
use crate::submitter::{SimulatedSubmitter, TradeSubmitter};

/// Shared collaborators for one engine instance.
#[derive(Clone)]
pub struct EngineContext {
    pub quotes: Arc<dyn QuoteProvider>,
    pub submitter: Arc<dyn TradeSubmitter>,
    pub balances: Arc<dyn BalanceProvider>,
    pub oracle: Arc<dyn PriceOracle>,
    pub broadcaster: Arc<ProgressBroadcaster>,
    pub history: Arc<TradeHistoryLog>,
}

impl EngineContext {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        submitter: Arc<dyn TradeSubmitter>,
        balances: Arc<dyn BalanceProvider>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        Self {
            quotes,
            submitter,
            balances,
            oracle,
            broadcaster: Arc::new(ProgressBroadcaster::new()),
            history: Arc::new(TradeHistoryLog::new()),
        }
    }

    /// Fully simulated context: deterministic quotes and submissions given
    /// the seed, every wallet holding 10 SOL, a fixed 100 USD oracle.
    pub fn simulated(seed: u64) -> Self {
        Self::new(
            Arc::new(SimulatedQuoteProvider::new(seed)),
            Arc::new(SimulatedSubmitter::new(seed.wrapping_add(1))),
            Arc::new(StaticBalances::new(dec!(10))),
            Arc::new(FixedPriceOracle::default()),
        )
    }

    /// Simulated context whose submitter never injects synthetic failures.
    /// Keeps timing-sensitive tests from tripping over the failure roll.
    pub fn simulated_reliable(seed: u64) -> Self {
        Self::new(
            Arc::new(SimulatedQuoteProvider::new(seed)),
            Arc::new(SimulatedSubmitter::reliable(seed.wrapping_add(1))),
            Arc::new(StaticBalances::new(dec!(10))),
            Arc::new(FixedPriceOracle::default()),
        )
    }
}

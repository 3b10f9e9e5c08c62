//! Balance-lookup collaborator.
//!
//! The engine only needs one question answered before starting a job: does
//! this wallet hold enough SOL to cover the round-trip requirement. The
//! real implementation would query an RPC node; the static implementation
//! backs tests and offline runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::EngineResult;

/// Read-only view of wallet balances.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Available SOL balance for the wallet.
    async fn available_balance(&self, wallet_pubkey: &str) -> EngineResult<Decimal>;
}

/// In-memory balance table with a default for unknown wallets.
pub struct StaticBalances {
    balances: RwLock<HashMap<String, Decimal>>,
    default_balance: Decimal,
}

impl StaticBalances {
    pub fn new(default_balance: Decimal) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            default_balance,
        }
    }

    /// Set the balance for a specific wallet.
    pub fn set_balance(&self, wallet_pubkey: impl Into<String>, balance: Decimal) {
        self.balances.write().insert(wallet_pubkey.into(), balance);
    }
}

#[async_trait]
impl BalanceProvider for StaticBalances {
    async fn available_balance(&self, wallet_pubkey: &str) -> EngineResult<Decimal> {
        Ok(self
            .balances
            .read()
            .get(wallet_pubkey)
            .copied()
            .unwrap_or(self.default_balance))
    }
}

//! Execution engine for timed buy/sell volume campaigns.
//!
//! Drives paired swaps through a swap-quote provider, tracks each job's
//! lifecycle in an in-memory registry, and streams progress events to
//! per-job and global subscribers. Ledger access sits behind capability
//! traits with deterministic simulated implementations.

pub mod balance;
pub mod broadcast;
pub mod context;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod history;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod pacing;
pub mod quote;
pub mod runner;
pub mod submitter;

pub use context::EngineContext;
pub use engine::ExecutionEngine;
pub use error::EngineError;

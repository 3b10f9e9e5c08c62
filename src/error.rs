//! Error types for the execution engine.
//!
//! The taxonomy separates caller errors (rejected synchronously, no job is
//! ever created), job-level failures (the job moves to a terminal `Failed`
//! state), and leg-level failures (absorbed into the trade-pair outcome,
//! the loop continues).

use thiserror::Error;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error type surfaced by engine operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// Caller supplied invalid parameters; rejected before a job exists.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidParameters { field: &'static str, reason: String },

    /// Wallet balance does not cover the round-trip requirement.
    #[error("Insufficient balance. Required: {required} SOL, Available: {available} SOL")]
    InsufficientBalance { required: String, available: String },

    /// A precondition for the whole job failed (e.g. no tradable market).
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Query against an unknown or already-terminal job id.
    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },

    /// Any other fault inside the execution loop; captured on the job.
    #[error("Execution fault: {0}")]
    Fault(String),

    /// Quote provider error that escaped the leg boundary.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Submission error that escaped the leg boundary.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl EngineError {
    /// Create an InvalidParameters error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameters {
            field,
            reason: reason.into(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(job_id: impl Into<String>) -> Self {
        EngineError::NotFound {
            job_id: job_id.into(),
        }
    }
}

/// Errors from the swap-quote provider boundary.
///
/// These are expected, transient failures: the runner records them as a
/// failed leg and moves on. Only `has_tradable_market` failures during
/// setup escalate to a job failure.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum QuoteError {
    /// HTTP-level failure talking to the provider
    #[error("Quote request failed: {0}")]
    Http(String),

    /// Provider did not respond within its timeout
    #[error("Quote request timed out")]
    Timeout,

    /// No swap route exists for the requested pair
    #[error("No route for mint {0}")]
    NoRoute(String),

    /// Provider responded with something we could not interpret
    #[error("Invalid quote response: {0}")]
    InvalidResponse(String),
}

/// Errors from the trade submission capability.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum SubmitError {
    /// The ledger (or its simulation) rejected the transaction
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Confirmation did not arrive in time
    #[error("Transaction confirmation timed out")]
    Timeout,
}

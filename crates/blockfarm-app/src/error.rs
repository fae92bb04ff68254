//! Application-level errors

use blockfarm_chain::ChainError;
use thiserror::Error;

/// Local form-input problems. Raised before any network call; a failed
/// validation never reaches the contract facade.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(&'static str),

    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    #[error("{0} is not a valid address")]
    InvalidAddress(&'static str),

    #[error("{0} does not match its EIP-55 checksum")]
    ChecksumMismatch(&'static str),
}

/// Errors surfaced to the shell. Remote errors are mapped at the call
/// site and displayed near the triggering action; they never crash the
/// shell, and nothing is retried without an explicit user re-initiation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("wallet is not connected")]
    NotConnected,

    #[error("a {0} request is already in flight")]
    Busy(&'static str),

    #[error("the {0} module is not available for this account")]
    ModuleUnavailable(&'static str),
}

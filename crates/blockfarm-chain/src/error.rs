//! Error taxonomy for chain-facing operations

use thiserror::Error;

/// Errors surfaced by wallet, contract and event-query operations.
///
/// Validation problems never appear here: input is validated before a call
/// is allowed to reach the facade. Nothing in this taxonomy is retried
/// automatically; every recoverable case requires explicit user action.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No usable wallet is available in the environment.
    #[error("no wallet available; set a signing key to interact with the registry")]
    ProviderUnavailable,

    /// The user dismissed the wallet prompt.
    #[error("the wallet request was rejected")]
    UserRejected,

    /// A wallet prompt is already open; it must be completed or cancelled
    /// before a new one is issued.
    #[error("a wallet request is already pending; complete or cancel it first")]
    RequestPending,

    /// The contract rejected the transaction. `reason` carries the remote
    /// revert reason verbatim when one was supplied.
    #[error("transaction reverted: {reason}")]
    TransactionReverted { reason: String },

    /// The transaction left the mempool without ever being mined.
    #[error("transaction dropped before confirmation")]
    TransactionDropped,

    /// `obtenerLote` reported the queried identifier as nonexistent.
    #[error("no lot is registered under that series code")]
    LotNotFound,

    /// An event query failed. Independent of lot-snapshot failures: a
    /// timeline can be unavailable while the lot itself renders fine.
    #[error("event query failed: {0}")]
    EventQueryFailed(String),

    /// Transport or node-level failure.
    #[error("rpc error: {0}")]
    Rpc(String),
}

//! BlockFarm - Pharmaceutical Batch Registry Client
//!
//! Chain-facing client library for the BlockFarm medicine registry, a
//! pre-deployed EVM contract that tracks pharmaceutical lots and the
//! operational roles allowed to act on them.
//!
//! Key pieces:
//! - Wallet connector over an injected `WalletProvider` (signer acquisition,
//!   account/chain change notifications)
//! - Typed contract facade for lot registration, transfer and role calls
//! - Traceability reconstruction: registration and transfer events merged
//!   into a single ownership timeline
//!
//! All durable state lives in the contract; this crate only reads snapshots
//! and emitted events and submits signed transactions.

pub mod error;
pub mod registry;
pub mod state;
pub mod trace;
pub mod wallet;

pub use error::ChainError;
pub use registry::{RegistryClient, TxOutcome};
pub use state::{lot_id, Lot, NewLot, ResponsibleParty, Role, RoleHashes, RoleSet};
pub use trace::{trace_lot, LotTrace, OwnershipRecord};
pub use wallet::{Connection, EnvWallet, WalletConnector, WalletEvent, WalletProvider};

//! BlockFarm - Registry Application Shell
//!
//! Orchestrates the chain client into the user-facing flows of the batch
//! registry: form state with submission-time validation, role-gated
//! navigation, and the session lifecycle around wallet events.
//!
//! Nothing here is a security boundary. Role gating only decides what the
//! shell offers; the contract enforces membership on every call.

pub mod app;
pub mod config;
pub mod error;
pub mod forms;
pub mod guard;
pub mod session;
pub mod tabs;

pub use app::{short_address, App, RegistrationSummary};
pub use config::AppConfig;
pub use error::{AppError, ValidationError};
pub use session::{RoleGate, RoleSession};
pub use tabs::NavTab;

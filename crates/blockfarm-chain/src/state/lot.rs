//! Lot state and the responsible-party record embedded at registration

use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use serde::Serialize;

/// On-chain lot identifier: keccak256 of the human-readable series code.
pub fn lot_id(series_code: &str) -> [u8; 32] {
    keccak256(series_code.as_bytes())
}

/// Legal representative recorded with a lot at registration time.
/// Immutable once submitted; the contract exposes no update path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponsibleParty {
    /// Full legal name
    pub full_name: String,

    /// National identity document (DNI / RUC)
    pub national_id: String,

    /// Contact phone number
    pub phone: String,

    /// Contact email
    pub email: String,
}

/// A lot registration about to be submitted to the contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLot {
    /// Commercial medicine name
    pub medicine_name: String,

    /// Active pharmaceutical ingredient
    pub active_ingredient: String,

    /// Human-readable series code; its keccak256 hash is the lot id
    pub series_code: String,

    /// Health-authority registration number (DIGEMID)
    pub health_registration: String,

    /// Manufacture date, epoch seconds
    pub manufacture_date: u64,

    /// Expiry date, epoch seconds
    pub expiry_date: u64,

    /// Registered unit count
    pub quantity: U256,

    /// Legal representative for the lot
    pub responsible: ResponsibleParty,
}

impl NewLot {
    /// Identifier this registration will be stored under.
    pub fn lot_id(&self) -> [u8; 32] {
        lot_id(&self.series_code)
    }
}

/// Snapshot of a registered lot as returned by `obtenerLote`.
///
/// Never cached across a session: every display is backed by a fresh read,
/// since the contract is the source of truth for ownership.
#[derive(Debug, Clone, Serialize)]
pub struct Lot {
    /// Commercial medicine name
    pub medicine_name: String,

    /// Active pharmaceutical ingredient
    pub active_ingredient: String,

    /// Health-authority registration number
    pub health_registration: String,

    /// Manufacture date, epoch seconds
    pub manufacture_date: u64,

    /// Expiry date, epoch seconds
    pub expiry_date: u64,

    /// Registered unit count
    pub quantity: U256,

    /// Legal representative recorded at registration
    pub responsible: ResponsibleParty,

    /// Current owner address
    pub owner: Address,

    /// Registration timestamp, epoch seconds
    pub registered_at: u64,

    /// Last transfer timestamp, epoch seconds; zero if never transferred
    pub last_transferred_at: u64,
}

/// Narrow a U256 chain value into the u64 range used for timestamps.
pub(crate) fn clamp_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

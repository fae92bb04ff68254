//! Form state holders
//!
//! Each form owns a flat record of string-typed fields and applies no
//! validation while the user types, beyond what keeps the controls
//! operable (the medicine selector auto-fill). Validation happens once,
//! at submission, and blocks the call before it can reach the facade.

pub mod legal;
pub mod lot;
pub mod role;
pub mod transfer;

pub use legal::{LegalField, LegalForm};
pub use lot::{LotField, LotForm, Medication, MEDICATIONS};
pub use role::{RoleForm, RoleRequest};
pub use transfer::{TransferField, TransferForm, TransferRequest};

use chrono::NaiveDate;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;

use crate::error::ValidationError;

/// Non-empty, trimmed field value.
pub(crate) fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` date into epoch seconds at UTC midnight.
pub(crate) fn parse_date(value: &str, field: &'static str) -> Result<u64, ValidationError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(field))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or(ValidationError::InvalidDate(field))?;
    u64::try_from(midnight.and_utc().timestamp())
        .map_err(|_| ValidationError::InvalidDate(field))
}

/// Parse a strictly positive decimal integer quantity.
pub(crate) fn parse_quantity(value: &str) -> Result<U256, ValidationError> {
    let quantity = U256::from_dec_str(value.trim())
        .map_err(|_| ValidationError::InvalidQuantity)?;
    if quantity.is_zero() {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(quantity)
}

/// Parse an address, verifying the EIP-55 checksum for mixed-case input.
/// Single-case input is accepted as-is, matching common wallet behavior.
pub(crate) fn parse_address(value: &str, field: &'static str) -> Result<Address, ValidationError> {
    let trimmed = value.trim();
    let address = trimmed
        .parse::<Address>()
        .map_err(|_| ValidationError::InvalidAddress(field))?;

    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let mixed_case = body.chars().any(|c| c.is_ascii_uppercase())
        && body.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case && to_checksum(&address, None).trim_start_matches("0x") != body {
        return Err(ValidationError::ChecksumMismatch(field));
    }

    Ok(address)
}

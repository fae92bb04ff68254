//! Lot transfer form

use blockfarm_chain::lot_id;
use ethers::types::{Address, U256};

use crate::error::ValidationError;
use crate::forms::{parse_address, parse_quantity, required};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferField {
    SeriesCode,
    Recipient,
    Quantity,
}

/// Field state for the transfer form.
#[derive(Debug, Clone, Default)]
pub struct TransferForm {
    pub series_code: String,
    pub recipient: String,
    pub quantity: String,
}

/// A validated transfer, ready for the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub lot_id: [u8; 32],
    pub recipient: Address,
    pub quantity: U256,
}

impl TransferForm {
    pub fn set(&mut self, field: TransferField, value: impl Into<String>) {
        let value = value.into();
        match field {
            TransferField::SeriesCode => self.series_code = value,
            TransferField::Recipient => self.recipient = value,
            TransferField::Quantity => self.quantity = value,
        }
    }

    /// Requested quantity is only checked for being a positive integer;
    /// whether it fits the lot's remaining stock is the contract's rule.
    pub fn validate(&self) -> Result<TransferRequest, ValidationError> {
        let series_code = required(&self.series_code, "series code")?;
        let recipient = parse_address(&self.recipient, "recipient")?;
        let quantity = parse_quantity(&self.quantity)?;

        Ok(TransferRequest { lot_id: lot_id(&series_code), recipient, quantity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn malformed_recipients_are_rejected_locally() {
        let mut form = TransferForm::default();
        form.set(TransferField::SeriesCode, "CODE-12345");
        form.set(TransferField::Quantity, "10");

        form.set(TransferField::Recipient, "0x123");
        assert_eq!(
            form.validate(),
            Err(ValidationError::InvalidAddress("recipient"))
        );

        form.set(TransferField::Recipient, RECIPIENT);
        let request = form.validate().unwrap();
        assert_eq!(request.lot_id, lot_id("CODE-12345"));
        assert_eq!(request.quantity, U256::from(10u64));
    }
}

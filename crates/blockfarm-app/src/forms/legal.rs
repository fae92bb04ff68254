//! Legal representative form

use blockfarm_chain::ResponsibleParty;

use crate::error::ValidationError;
use crate::forms::required;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalField {
    FullName,
    NationalId,
    Phone,
    Email,
}

/// Field state for the legal representative attached to a registration.
#[derive(Debug, Clone, Default)]
pub struct LegalForm {
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
}

impl LegalForm {
    pub fn set(&mut self, field: LegalField, value: impl Into<String>) {
        let value = value.into();
        match field {
            LegalField::FullName => self.full_name = value,
            LegalField::NationalId => self.national_id = value,
            LegalField::Phone => self.phone = value,
            LegalField::Email => self.email = value,
        }
    }

    /// Name and national id are mandatory; contact fields are optional.
    pub fn validate(&self) -> Result<ResponsibleParty, ValidationError> {
        Ok(ResponsibleParty {
            full_name: required(&self.full_name, "representative name")?,
            national_id: required(&self.national_id, "national id")?,
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

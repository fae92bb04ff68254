//! Lot registration form

use blockfarm_chain::NewLot;
use rand::Rng;

use crate::error::ValidationError;
use crate::forms::legal::LegalForm;
use crate::forms::{parse_date, parse_quantity, required};

/// Entry in the local medication catalog. Selecting a medicine by name
/// auto-fills the dependent fields from this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Medication {
    pub name: &'static str,
    pub active_ingredient: &'static str,
    pub health_registration: &'static str,
}

pub const MEDICATIONS: [Medication; 5] = [
    Medication {
        name: "Paracetamol 500 mg",
        active_ingredient: "Paracetamol",
        health_registration: "DIG-2025-0001",
    },
    Medication {
        name: "Amoxicilina 500 mg",
        active_ingredient: "Amoxicilina",
        health_registration: "DIG-2025-0002",
    },
    Medication {
        name: "Ibuprofeno 400 mg",
        active_ingredient: "Ibuprofeno",
        health_registration: "DIG-2025-0003",
    },
    Medication {
        name: "Azitromicina 500 mg",
        active_ingredient: "Azitromicina",
        health_registration: "DIG-2025-0004",
    },
    Medication {
        name: "Metformina 850 mg",
        active_ingredient: "Metformina",
        health_registration: "DIG-2025-0005",
    },
];

pub fn find_medication(name: &str) -> Option<&'static Medication> {
    MEDICATIONS.iter().find(|medication| medication.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotField {
    MedicineName,
    ActiveIngredient,
    SeriesCode,
    MfgDate,
    ExpDate,
    HealthRegistration,
    Quantity,
}

/// Field state for the lot registration form. All values are the raw
/// strings the user typed; nothing is parsed until submission.
#[derive(Debug, Clone, Default)]
pub struct LotForm {
    pub medicine_name: String,
    pub active_ingredient: String,
    pub series_code: String,
    pub mfg_date: String,
    pub exp_date: String,
    pub health_registration: String,
    pub quantity: String,
}

impl LotForm {
    /// Apply a single field change. Choosing a medicine name fills the
    /// active ingredient and registration number from the catalog, and
    /// clears them for names the catalog does not know.
    pub fn set(&mut self, field: LotField, value: impl Into<String>) {
        let value = value.into();
        match field {
            LotField::MedicineName => {
                let medication = find_medication(&value);
                self.active_ingredient = medication
                    .map(|m| m.active_ingredient.to_string())
                    .unwrap_or_default();
                self.health_registration = medication
                    .map(|m| m.health_registration.to_string())
                    .unwrap_or_default();
                self.medicine_name = value;
            }
            LotField::ActiveIngredient => self.active_ingredient = value,
            LotField::SeriesCode => self.series_code = value,
            LotField::MfgDate => self.mfg_date = value,
            LotField::ExpDate => self.exp_date = value,
            LotField::HealthRegistration => self.health_registration = value,
            LotField::Quantity => self.quantity = value,
        }
    }

    /// Fill the series code with a generated `CODE-<n>` value.
    pub fn generate_series_code(&mut self) -> &str {
        let n: u32 = rand::thread_rng().gen_range(0..100_000);
        self.series_code = format!("CODE-{n}");
        &self.series_code
    }

    /// Submission-time validation; combines the lot fields with the legal
    /// representative form into a registration request.
    ///
    /// Manufacture-before-expiry ordering is deliberately not checked
    /// here; the contract owns that rule.
    pub fn validate(&self, legal: &LegalForm) -> Result<NewLot, ValidationError> {
        let medicine_name = required(&self.medicine_name, "medicine name")?;
        let series_code = required(&self.series_code, "series code")?;
        let manufacture_date = parse_date(&self.mfg_date, "manufacture date")?;
        let expiry_date = parse_date(&self.exp_date, "expiry date")?;
        let quantity = parse_quantity(&self.quantity)?;
        let responsible = legal.validate()?;

        Ok(NewLot {
            medicine_name,
            active_ingredient: self.active_ingredient.trim().to_string(),
            series_code,
            health_registration: self.health_registration.trim().to_string(),
            manufacture_date,
            expiry_date,
            quantity,
            responsible,
        })
    }
}

//! Medications owned by a user.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::validate_span;
use crate::types::{MedicationId, UserId, ValidationError, required_text};

/// A medication a user is (or was) taking.
///
/// Intake events and side effects reference a medication by id. Deactivating
/// a medication hides it from default listings but keeps its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: MedicationId,
    pub owner_id: UserId,
    pub name: String,
    /// Free text, e.g. "500mg" or "10ml".
    pub dosage: String,
    /// Free text, e.g. "Twice daily".
    pub frequency: String,
    pub start_date: NaiveDate,
    /// `None` means ongoing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub instructions: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating or replacing a medication's details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub instructions: String,
}

impl MedicationDraft {
    /// Trims text fields and checks required values and the date span.
    pub fn new(
        name: &str,
        dosage: &str,
        frequency: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        instructions: Option<&str>,
    ) -> Result<Self, ValidationError> {
        validate_span(start_date, end_date)?;
        Ok(Self {
            name: required_text(name, "name")?,
            dosage: required_text(dosage, "dosage")?,
            frequency: required_text(frequency, "frequency")?,
            start_date,
            end_date,
            instructions: instructions.map(str::trim).unwrap_or_default().to_string(),
        })
    }
}

impl Medication {
    /// Returns the draft describing this medication's current details.
    pub fn to_draft(&self) -> MedicationDraft {
        MedicationDraft {
            name: self.name.clone(),
            dosage: self.dosage.clone(),
            frequency: self.frequency.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            instructions: self.instructions.clone(),
        }
    }
}

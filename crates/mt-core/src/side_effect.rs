//! Reported side effects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::validate_span;
use crate::types::{MedicationId, Severity, SideEffectId, ValidationError, required_text};

/// A side effect attributed to a medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffect {
    pub id: SideEffectId,
    pub medication_id: MedicationId,
    /// e.g. "Nausea", "Headache".
    pub effect: String,
    pub severity: Severity,
    pub start_date: NaiveDate,
    /// `None` means still ongoing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

/// Validated input for reporting or editing a side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectDraft {
    pub effect: String,
    pub severity: Severity,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: String,
}

impl SideEffectDraft {
    pub fn new(
        effect: &str,
        severity: Severity,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<Self, ValidationError> {
        validate_span(start_date, end_date)?;
        Ok(Self {
            effect: required_text(effect, "effect")?,
            severity,
            start_date,
            end_date,
            notes: notes.map(str::trim).unwrap_or_default().to_string(),
        })
    }
}

impl SideEffect {
    /// Returns the draft describing this side effect's current details.
    pub fn to_draft(&self) -> SideEffectDraft {
        SideEffectDraft {
            effect: self.effect.clone(),
            severity: self.severity,
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self.notes.clone(),
        }
    }
}

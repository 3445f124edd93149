//! Daily intake events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{IntakeEventId, IntakeStatus, MedicationId};

/// The recorded outcome for one medication on one calendar day.
///
/// At most one event exists per `(medication_id, date)`; logging the same
/// pair again replaces the status and notes of the existing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeEvent {
    pub id: IntakeEventId,
    pub medication_id: MedicationId,
    /// UTC calendar day, time-stripped.
    pub date: NaiveDate,
    pub status: IntakeStatus,
    #[serde(default)]
    pub notes: String,
}

impl IntakeEvent {
    pub fn is_missed(&self) -> bool {
        self.status == IntakeStatus::Missed
    }

    pub fn is_taken(&self) -> bool {
        self.status == IntakeStatus::Taken
    }
}

//! The record store seam.
//!
//! The aggregator reads through this trait so it can run against the
//! SQLite store in production and an in-memory fixture in tests.

use chrono::NaiveDate;

use crate::calendar::DateRange;
use crate::intake::IntakeEvent;
use crate::medication::Medication;
use crate::side_effect::SideEffect;
use crate::types::{IntakeStatus, MedicationId, UserId};

/// Read and upsert access to medication records.
pub trait RecordStore {
    /// Error raised when the store cannot answer a query.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Medications owned by `owner_id`, newest first.
    fn find_medications_by_owner(
        &self,
        owner_id: &UserId,
        active_only: bool,
    ) -> Result<Vec<Medication>, Self::Error>;

    /// Intake events for the given medications, optionally limited to an
    /// inclusive range of calendar days.
    fn find_events_by_medication_ids(
        &self,
        ids: &[MedicationId],
        range: Option<DateRange>,
    ) -> Result<Vec<IntakeEvent>, Self::Error>;

    /// Side effects for the given medications.
    fn find_side_effects_by_medication_ids(
        &self,
        ids: &[MedicationId],
    ) -> Result<Vec<SideEffect>, Self::Error>;

    /// Records the outcome for a medication on a day.
    ///
    /// If an event already exists for `(medication_id, date)` its status and
    /// notes are replaced; no second event is created.
    fn upsert_event(
        &mut self,
        medication_id: &MedicationId,
        date: NaiveDate,
        status: IntakeStatus,
        notes: &str,
    ) -> Result<IntakeEvent, Self::Error>;
}

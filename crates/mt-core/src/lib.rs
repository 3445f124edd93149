//! Core domain logic for the medication adherence tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Records: medications, daily intake events, side effects, users
//! - Calendar: UTC day windows and date normalization
//! - Dashboard: adherence score, trend, most-missed and streak aggregation
//! - Roster: read-only clinician views of assigned patients

pub mod calendar;
pub mod dashboard;
pub mod intake;
pub mod medication;
pub mod roster;
pub mod side_effect;
pub mod store;
pub mod types;
pub mod user;

pub use calendar::{DateRange, DayWindow, day_label, format_day, parse_day};
pub use dashboard::{
    DashboardContext, DashboardSummary, MedicationScope, MostMissed, StatusBreakdown, TrendPoint,
    compute_dashboard, summarize,
};
pub use intake::IntakeEvent;
pub use medication::{Medication, MedicationDraft};
pub use roster::PatientDetail;
pub use side_effect::{SideEffect, SideEffectDraft};
pub use store::RecordStore;
pub use types::{
    IntakeEventId, IntakeStatus, MedicationId, Role, Severity, SideEffectId, UserId,
    ValidationError,
};
pub use user::User;

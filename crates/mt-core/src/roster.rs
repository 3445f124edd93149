//! Read-only clinician views of assigned patients.

use serde::Serialize;

use crate::dashboard::adherence_score;
use crate::intake::IntakeEvent;
use crate::medication::Medication;
use crate::side_effect::SideEffect;
use crate::user::User;

/// How many intake events the patient detail lists.
pub const RECENT_EVENT_LIMIT: usize = 30;

/// Everything a clinician sees for one patient.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    pub patient: User,
    /// All medications, newest first.
    pub medications: Vec<Medication>,
    /// The most recent intake events, newest first.
    pub recent_events: Vec<IntakeEvent>,
    /// All side effects, most recent start date first.
    pub side_effects: Vec<SideEffect>,
    /// Adherence over every recorded event, not just the recent ones.
    pub adherence_score: Option<u8>,
}

impl PatientDetail {
    /// Assembles the detail view from the patient's full history.
    pub fn new(
        patient: User,
        medications: Vec<Medication>,
        mut events: Vec<IntakeEvent>,
        mut side_effects: Vec<SideEffect>,
    ) -> Self {
        let adherence_score = adherence_score(&events);

        events.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        events.truncate(RECENT_EVENT_LIMIT);
        side_effects.sort_by(|a, b| b.start_date.cmp(&a.start_date).then_with(|| a.id.cmp(&b.id)));

        Self {
            patient,
            medications,
            recent_events: events,
            side_effects,
            adherence_score,
        }
    }
}

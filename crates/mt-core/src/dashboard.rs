//! Adherence aggregation for the patient dashboard.
//!
//! Computes summary statistics over one user's intake history. Every
//! computation is a pure function over typed record slices; the only I/O
//! happens in [`compute_dashboard`], which reads a fixed sequence of
//! snapshots from a [`RecordStore`] and hands them to [`summarize`].
//!
//! # Conventions
//!
//! - All day math is in UTC (see [`crate::calendar`]).
//! - Percentages are `round(100 * part / total)` with halves rounded up.
//! - "No data" is `None`, never `0`: a user with no events has no score,
//!   and a trend day with no events has no adherence value.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{DateRange, day_label};
use crate::intake::IntakeEvent;
use crate::medication::Medication;
use crate::side_effect::SideEffect;
use crate::store::RecordStore;
use crate::types::{IntakeStatus, MedicationId, UserId};

/// Number of days covered by the adherence trend, ending today.
pub const TREND_DAYS: u32 = 7;

/// Number of severity levels (1..=5) in the histogram.
pub const SEVERITY_LEVELS: usize = 5;

/// Name shown when a missed event references a medication outside the scope.
const UNKNOWN_MEDICATION: &str = "Unknown";

/// Which of the owner's medications the dashboard aggregates over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MedicationScope {
    /// Active and deactivated medications.
    #[default]
    All,
    /// Only medications still marked active.
    ActiveOnly,
}

/// Per-request inputs captured once before any aggregation runs.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub today: NaiveDate,
    pub scope: MedicationScope,
    /// Every medication the owner has, active or not.
    medications: Vec<Medication>,
}

impl DashboardContext {
    pub const fn new(
        today: NaiveDate,
        scope: MedicationScope,
        medications: Vec<Medication>,
    ) -> Self {
        Self {
            today,
            scope,
            medications,
        }
    }

    /// Medications the aggregation runs over.
    pub fn in_scope(&self) -> impl Iterator<Item = &Medication> {
        let active_only = self.scope == MedicationScope::ActiveOnly;
        self.medications
            .iter()
            .filter(move |m| !active_only || m.is_active)
    }

    /// Ids of the medications in scope, sorted.
    pub fn medication_ids(&self) -> Vec<MedicationId> {
        let mut ids: Vec<_> = self.in_scope().map(|m| m.id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn active_medication_count(&self) -> usize {
        self.medications.iter().filter(|m| m.is_active).count()
    }

    pub fn total_medication_count(&self) -> usize {
        self.medications.len()
    }
}

/// Counts of each intake status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub taken: u32,
    pub missed: u32,
    pub late: u32,
}

impl StatusBreakdown {
    fn record(&mut self, status: IntakeStatus) {
        match status {
            IntakeStatus::Taken => self.taken += 1,
            IntakeStatus::Missed => self.missed += 1,
            IntakeStatus::Late => self.late += 1,
        }
    }

    pub const fn total(&self) -> u32 {
        self.taken + self.missed + self.late
    }

    /// Share of taken events, or `None` if nothing was recorded.
    pub fn adherence(&self) -> Option<u8> {
        percentage(self.taken, self.total())
    }
}

/// The medication with the most missed doses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostMissed {
    pub medication_id: MedicationId,
    pub name: String,
    pub miss_count: u32,
}

/// Adherence for one day of the trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub label: String,
    /// `None` when no events were recorded that day.
    pub adherence: Option<u8>,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub adherence_score: Option<u8>,
    pub most_missed_medication: Option<MostMissed>,
    pub severity_histogram: [u32; SEVERITY_LEVELS],
    pub weekly_trend: Vec<TrendPoint>,
    pub status_breakdown: StatusBreakdown,
    pub missed_dose_streak: u32,
    pub active_medication_count: usize,
    pub total_medication_count: usize,
}

/// `round(100 * part / total)` with halves rounded up; `None` if `total == 0`.
pub fn percentage(part: u32, total: u32) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let (part, total) = (u64::from(part), u64::from(total));
    let rounded = (200 * part + total) / (2 * total);
    Some(u8::try_from(rounded).unwrap_or(u8::MAX))
}

/// Counts taken, missed and late events.
pub fn status_breakdown(events: &[IntakeEvent]) -> StatusBreakdown {
    let mut breakdown = StatusBreakdown::default();
    for event in events {
        breakdown.record(event.status);
    }
    breakdown
}

/// Overall share of taken events; `None` when there are no events.
pub fn adherence_score(events: &[IntakeEvent]) -> Option<u8> {
    status_breakdown(events).adherence()
}

/// Finds the medication with the highest missed count.
///
/// Ties go to the lexicographically smallest medication id, so identical
/// input always yields the same answer.
pub fn most_missed(events: &[IntakeEvent], medications: &[Medication]) -> Option<MostMissed> {
    let mut missed: BTreeMap<&MedicationId, u32> = BTreeMap::new();
    for event in events.iter().filter(|e| e.is_missed()) {
        *missed.entry(&event.medication_id).or_default() += 1;
    }

    let mut best: Option<(&MedicationId, u32)> = None;
    for (id, count) in missed {
        // Strict comparison keeps the earliest id on ties.
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((id, count));
        }
    }

    best.map(|(id, miss_count)| {
        let name = medications
            .iter()
            .find(|m| &m.id == id)
            .map_or_else(|| UNKNOWN_MEDICATION.to_string(), |m| m.name.clone());
        MostMissed {
            medication_id: id.clone(),
            name,
            miss_count,
        }
    })
}

/// Side effect counts per severity; index 0 is severity 1.
pub fn severity_histogram(side_effects: &[SideEffect]) -> [u32; SEVERITY_LEVELS] {
    let mut histogram = [0; SEVERITY_LEVELS];
    for side_effect in side_effects {
        histogram[side_effect.severity.bucket()] += 1;
    }
    histogram
}

/// Groups events into calendar-day buckets.
pub fn tally_by_day(events: &[IntakeEvent]) -> BTreeMap<NaiveDate, StatusBreakdown> {
    let mut days: BTreeMap<NaiveDate, StatusBreakdown> = BTreeMap::new();
    for event in events {
        days.entry(event.date).or_default().record(event.status);
    }
    days
}

/// Daily adherence for the [`TREND_DAYS`] days ending at `today`, oldest first.
pub fn weekly_trend(events: &[IntakeEvent], today: NaiveDate) -> Vec<TrendPoint> {
    let window = DateRange::trailing(today, TREND_DAYS);
    let in_window: Vec<IntakeEvent> = events
        .iter()
        .filter(|e| window.contains(e.date))
        .cloned()
        .collect();
    let days = tally_by_day(&in_window);

    window
        .days()
        .map(|date| TrendPoint {
            date,
            label: day_label(date),
            adherence: days.get(&date).and_then(StatusBreakdown::adherence),
        })
        .collect()
}

/// Number of consecutive recorded days with a missed dose, counted back
/// from the most recent recorded day.
///
/// Only days that have events take part. Walking backwards, days without a
/// missed dose are skipped until the first missed day starts the run; after
/// that, the first day without a missed dose ends the scan. Days after
/// `today` are ignored.
pub fn missed_dose_streak(events: &[IntakeEvent], today: NaiveDate) -> u32 {
    let days = tally_by_day(events);
    let mut streak = 0;
    for (_, tally) in days.range(..=today).rev() {
        if tally.missed > 0 {
            streak += 1;
        } else if streak > 0 {
            break;
        }
    }
    streak
}

/// Computes the full summary from already-fetched records.
///
/// Events and side effects outside the context's medication scope are
/// ignored.
pub fn summarize(
    context: &DashboardContext,
    events: &[IntakeEvent],
    side_effects: &[SideEffect],
) -> DashboardSummary {
    let scope: HashSet<&MedicationId> = context.in_scope().map(|m| &m.id).collect();
    let events: Vec<IntakeEvent> = events
        .iter()
        .filter(|e| scope.contains(&e.medication_id))
        .cloned()
        .collect();
    let side_effects: Vec<SideEffect> = side_effects
        .iter()
        .filter(|s| scope.contains(&s.medication_id))
        .cloned()
        .collect();

    let breakdown = status_breakdown(&events);

    DashboardSummary {
        today: context.today,
        adherence_score: breakdown.adherence(),
        most_missed_medication: most_missed(&events, &context.medications),
        severity_histogram: severity_histogram(&side_effects),
        weekly_trend: weekly_trend(&events, context.today),
        status_breakdown: breakdown,
        missed_dose_streak: missed_dose_streak(&events, context.today),
        active_medication_count: context.active_medication_count(),
        total_medication_count: context.total_medication_count(),
    }
}

/// Loads one owner's records and computes their dashboard.
///
/// The medication scope and `today` are captured once up front; every later
/// query uses the same id set. A store failure aborts the whole request.
pub fn compute_dashboard<S: RecordStore>(
    store: &S,
    owner_id: &UserId,
    today: NaiveDate,
    scope: MedicationScope,
) -> Result<DashboardSummary, S::Error> {
    let medications = store.find_medications_by_owner(owner_id, false)?;
    let context = DashboardContext::new(today, scope, medications);
    let ids = context.medication_ids();

    let events = store.find_events_by_medication_ids(&ids, None)?;
    let side_effects = store.find_side_effects_by_medication_ids(&ids)?;
    tracing::debug!(
        owner = %owner_id,
        %today,
        medications = ids.len(),
        events = events.len(),
        side_effects = side_effects.len(),
        "computing dashboard"
    );

    Ok(summarize(&context, &events, &side_effects))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use chrono::{Duration, TimeZone, Utc};
    use thiserror::Error;

    use crate::types::{IntakeEventId, Severity, SideEffectId};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(2025, 3, 10)
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    fn medication(id: &str, name: &str, active: bool) -> Medication {
        Medication {
            id: MedicationId::new(id).unwrap(),
            owner_id: UserId::new("user-1").unwrap(),
            name: name.to_string(),
            dosage: "10mg".to_string(),
            frequency: "Once daily".to_string(),
            start_date: day(2025, 1, 1),
            end_date: None,
            instructions: String::new(),
            is_active: active,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn event(med: &str, date: NaiveDate, status: IntakeStatus) -> IntakeEvent {
        IntakeEvent {
            id: IntakeEventId::new(format!("{med}-{date}")).unwrap(),
            medication_id: MedicationId::new(med).unwrap(),
            date,
            status,
            notes: String::new(),
        }
    }

    fn side_effect(med: &str, severity: i64) -> SideEffect {
        SideEffect {
            id: SideEffectId::new(format!("{med}-{severity}")).unwrap(),
            medication_id: MedicationId::new(med).unwrap(),
            effect: "Nausea".to_string(),
            severity: Severity::new(severity).unwrap(),
            start_date: day(2025, 3, 1),
            end_date: None,
            notes: String::new(),
        }
    }

    // ========== Percentages ==========

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), Some(13)); // 12.5
        assert_eq!(percentage(1, 3), Some(33));
        assert_eq!(percentage(2, 3), Some(67));
        assert_eq!(percentage(0, 4), Some(0));
        assert_eq!(percentage(4, 4), Some(100));
    }

    #[test]
    fn percentage_of_nothing_is_none() {
        assert_eq!(percentage(0, 0), None);
    }

    // ========== Score and breakdown ==========

    #[test]
    fn adherence_score_is_none_without_events() {
        assert_eq!(adherence_score(&[]), None);
    }

    #[test]
    fn adherence_score_all_missed_is_zero_not_none() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Missed),
            event("m1", days_ago(1), IntakeStatus::Missed),
        ];
        assert_eq!(adherence_score(&events), Some(0));
    }

    #[test]
    fn adherence_score_counts_late_as_not_taken() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m1", days_ago(1), IntakeStatus::Late),
            event("m1", days_ago(2), IntakeStatus::Taken),
        ];
        assert_eq!(adherence_score(&events), Some(67));
    }

    #[test]
    fn status_breakdown_sums_to_total() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m1", days_ago(1), IntakeStatus::Late),
            event("m2", days_ago(1), IntakeStatus::Missed),
            event("m2", days_ago(2), IntakeStatus::Missed),
            event("m2", days_ago(3), IntakeStatus::Taken),
        ];
        let breakdown = status_breakdown(&events);
        assert_eq!(
            breakdown,
            StatusBreakdown {
                taken: 2,
                missed: 2,
                late: 1
            }
        );
        assert_eq!(breakdown.total() as usize, events.len());
    }

    // ========== Most missed ==========

    #[test]
    fn most_missed_picks_highest_count() {
        let meds = vec![medication("m1", "Aspirin", true), medication("m2", "Statin", true)];
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Missed),
            event("m2", days_ago(0), IntakeStatus::Missed),
            event("m2", days_ago(1), IntakeStatus::Missed),
            event("m1", days_ago(1), IntakeStatus::Taken),
        ];
        let top = most_missed(&events, &meds).unwrap();
        assert_eq!(top.name, "Statin");
        assert_eq!(top.miss_count, 2);
    }

    #[test]
    fn most_missed_ties_break_on_smallest_id() {
        let meds = vec![medication("b-med", "Beta", true), medication("a-med", "Alpha", true)];
        let mut events = Vec::new();
        for n in 0..3 {
            events.push(event("b-med", days_ago(n), IntakeStatus::Missed));
            events.push(event("a-med", days_ago(n), IntakeStatus::Missed));
        }

        let first = most_missed(&events, &meds).unwrap();
        assert_eq!(first.medication_id.as_str(), "a-med");
        assert_eq!(first.miss_count, 3);

        events.reverse();
        for _ in 0..5 {
            assert_eq!(most_missed(&events, &meds).as_ref(), Some(&first));
        }
    }

    #[test]
    fn most_missed_is_none_without_missed_events() {
        let meds = vec![medication("m1", "Aspirin", true)];
        let events = vec![event("m1", days_ago(0), IntakeStatus::Taken)];
        assert_eq!(most_missed(&events, &meds), None);
        assert_eq!(most_missed(&[], &meds), None);
    }

    #[test]
    fn most_missed_names_unknown_medication() {
        let events = vec![event("gone", days_ago(0), IntakeStatus::Missed)];
        assert_eq!(most_missed(&events, &[]).unwrap().name, "Unknown");
    }

    // ========== Severity histogram ==========

    #[test]
    fn severity_histogram_zero_fills_missing_levels() {
        let effects = vec![side_effect("m1", 1), side_effect("m1", 4), side_effect("m2", 4)];
        let histogram = severity_histogram(&effects);
        assert_eq!(histogram, [1, 0, 0, 2, 0]);
        assert_eq!(histogram.iter().sum::<u32>() as usize, effects.len());
    }

    #[test]
    fn severity_histogram_empty_is_all_zero() {
        assert_eq!(severity_histogram(&[]), [0; SEVERITY_LEVELS]);
    }

    // ========== Weekly trend ==========

    #[test]
    fn weekly_trend_has_seven_days_oldest_first() {
        let trend = weekly_trend(&[], today());
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, days_ago(6));
        assert_eq!(trend[6].date, today());
        assert!(trend.windows(2).all(|w| w[0].date < w[1].date));
        assert!(trend.iter().all(|p| p.adherence.is_none()));
    }

    #[test]
    fn weekly_trend_distinguishes_no_data_from_zero() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m2", days_ago(0), IntakeStatus::Missed),
            event("m1", days_ago(2), IntakeStatus::Missed),
            event("m2", days_ago(2), IntakeStatus::Missed),
        ];
        let trend = weekly_trend(&events, today());
        assert_eq!(trend[6].adherence, Some(50));
        assert_eq!(trend[5].adherence, None);
        assert_eq!(trend[4].adherence, Some(0));
    }

    #[test]
    fn weekly_trend_ignores_events_outside_window() {
        let events = vec![
            event("m1", days_ago(7), IntakeStatus::Taken),
            event("m1", today() + Duration::days(1), IntakeStatus::Taken),
        ];
        let trend = weekly_trend(&events, today());
        assert!(trend.iter().all(|p| p.adherence.is_none()));
    }

    #[test]
    fn weekly_trend_labels_days() {
        let trend = weekly_trend(&[], today());
        assert_eq!(trend[6].label, "Mon, Mar 10");
        assert_eq!(trend[0].label, "Tue, Mar 4");
    }

    // ========== Missed-dose streak ==========

    #[test]
    fn streak_stops_at_first_gap_after_run_starts() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m1", days_ago(1), IntakeStatus::Missed),
            event("m1", days_ago(2), IntakeStatus::Missed),
            event("m1", days_ago(3), IntakeStatus::Taken),
            event("m1", days_ago(4), IntakeStatus::Missed),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 2);
    }

    #[test]
    fn streak_counts_today_when_missed() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Missed),
            event("m1", days_ago(1), IntakeStatus::Missed),
            event("m1", days_ago(2), IntakeStatus::Taken),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 2);
    }

    #[test]
    fn streak_starts_from_latest_day_when_today_is_empty() {
        let events = vec![
            event("m1", days_ago(3), IntakeStatus::Missed),
            event("m1", days_ago(4), IntakeStatus::Missed),
            event("m1", days_ago(5), IntakeStatus::Missed),
            event("m1", days_ago(6), IntakeStatus::Taken),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 3);
    }

    #[test]
    fn streak_day_with_any_missed_dose_counts() {
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m2", days_ago(0), IntakeStatus::Missed),
            event("m1", days_ago(1), IntakeStatus::Late),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 1);
    }

    #[test]
    fn streak_skips_days_without_records() {
        let events = vec![
            event("m1", days_ago(1), IntakeStatus::Missed),
            event("m1", days_ago(5), IntakeStatus::Missed),
            event("m1", days_ago(6), IntakeStatus::Taken),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 2);
    }

    #[test]
    fn streak_ignores_future_days() {
        let events = vec![
            event("m1", today() + Duration::days(1), IntakeStatus::Taken),
            event("m1", days_ago(0), IntakeStatus::Missed),
        ];
        assert_eq!(missed_dose_streak(&events, today()), 1);
    }

    #[test]
    fn streak_is_zero_without_missed_days() {
        let events = vec![event("m1", days_ago(0), IntakeStatus::Taken)];
        assert_eq!(missed_dose_streak(&events, today()), 0);
        assert_eq!(missed_dose_streak(&[], today()), 0);
    }

    // ========== Summary ==========

    #[test]
    fn summarize_empty_scope_uses_sentinels() {
        let context = DashboardContext::new(today(), MedicationScope::All, Vec::new());
        let summary = summarize(&context, &[], &[]);

        assert_eq!(summary.adherence_score, None);
        assert_eq!(summary.status_breakdown, StatusBreakdown::default());
        assert_eq!(summary.most_missed_medication, None);
        assert_eq!(summary.severity_histogram, [0; SEVERITY_LEVELS]);
        assert_eq!(summary.weekly_trend.len(), 7);
        assert!(summary.weekly_trend.iter().all(|p| p.adherence.is_none()));
        assert_eq!(summary.missed_dose_streak, 0);
        assert_eq!(summary.total_medication_count, 0);
    }

    #[test]
    fn summarize_active_scope_excludes_inactive_history() {
        let meds = vec![medication("m1", "Aspirin", true), medication("m2", "Old", false)];
        let events = vec![
            event("m1", days_ago(0), IntakeStatus::Taken),
            event("m2", days_ago(0), IntakeStatus::Missed),
        ];
        let effects = vec![side_effect("m1", 2), side_effect("m2", 5)];

        let all = summarize(
            &DashboardContext::new(today(), MedicationScope::All, meds.clone()),
            &events,
            &effects,
        );
        assert_eq!(all.adherence_score, Some(50));
        assert_eq!(all.severity_histogram, [0, 1, 0, 0, 1]);

        let active = summarize(
            &DashboardContext::new(today(), MedicationScope::ActiveOnly, meds),
            &events,
            &effects,
        );
        assert_eq!(active.adherence_score, Some(100));
        assert_eq!(active.severity_histogram, [0, 1, 0, 0, 0]);
        assert_eq!(active.active_medication_count, 1);
        assert_eq!(active.total_medication_count, 2);
    }

    #[test]
    fn summary_serializes_nulls_in_camel_case() {
        let context = DashboardContext::new(today(), MedicationScope::All, Vec::new());
        let json = serde_json::to_value(summarize(&context, &[], &[])).unwrap();

        assert!(json["adherenceScore"].is_null());
        assert!(json["mostMissedMedication"].is_null());
        assert_eq!(json["severityHistogram"], serde_json::json!([0, 0, 0, 0, 0]));
        assert_eq!(json["weeklyTrend"].as_array().unwrap().len(), 7);
        assert!(json["weeklyTrend"][6]["adherence"].is_null());
        assert_eq!(json["weeklyTrend"][6]["date"], "2025-03-10");
        assert_eq!(json["missedDoseStreak"], 0);
    }

    // ========== Store orchestration ==========

    #[derive(Default)]
    struct MemoryStore {
        medications: Vec<Medication>,
        events: Vec<IntakeEvent>,
        side_effects: Vec<SideEffect>,
    }

    impl RecordStore for MemoryStore {
        type Error = Infallible;

        fn find_medications_by_owner(
            &self,
            owner_id: &UserId,
            active_only: bool,
        ) -> Result<Vec<Medication>, Self::Error> {
            Ok(self
                .medications
                .iter()
                .filter(|m| &m.owner_id == owner_id && (!active_only || m.is_active))
                .cloned()
                .collect())
        }

        fn find_events_by_medication_ids(
            &self,
            ids: &[MedicationId],
            range: Option<DateRange>,
        ) -> Result<Vec<IntakeEvent>, Self::Error> {
            Ok(self
                .events
                .iter()
                .filter(|e| ids.contains(&e.medication_id))
                .filter(|e| range.is_none_or(|r| r.contains(e.date)))
                .cloned()
                .collect())
        }

        fn find_side_effects_by_medication_ids(
            &self,
            ids: &[MedicationId],
        ) -> Result<Vec<SideEffect>, Self::Error> {
            Ok(self
                .side_effects
                .iter()
                .filter(|s| ids.contains(&s.medication_id))
                .cloned()
                .collect())
        }

        fn upsert_event(
            &mut self,
            medication_id: &MedicationId,
            date: NaiveDate,
            status: IntakeStatus,
            notes: &str,
        ) -> Result<IntakeEvent, Self::Error> {
            if let Some(existing) = self
                .events
                .iter_mut()
                .find(|e| &e.medication_id == medication_id && e.date == date)
            {
                existing.status = status;
                existing.notes = notes.to_string();
                return Ok(existing.clone());
            }
            let mut created = event(medication_id.as_str(), date, status);
            created.notes = notes.to_string();
            self.events.push(created.clone());
            Ok(created)
        }
    }

    #[test]
    fn compute_dashboard_scopes_to_owner() {
        let mut other = medication("other-med", "Other", true);
        other.owner_id = UserId::new("user-2").unwrap();

        let mut store = MemoryStore {
            medications: vec![medication("m1", "Aspirin", true), other],
            ..MemoryStore::default()
        };
        let m1 = MedicationId::new("m1").unwrap();
        let other_id = MedicationId::new("other-med").unwrap();
        store
            .upsert_event(&m1, today(), IntakeStatus::Taken, "")
            .unwrap();
        store
            .upsert_event(&other_id, today(), IntakeStatus::Missed, "")
            .unwrap();

        let owner = UserId::new("user-1").unwrap();
        let summary = compute_dashboard(&store, &owner, today(), MedicationScope::All).unwrap();
        assert_eq!(summary.adherence_score, Some(100));
        assert_eq!(summary.status_breakdown.total(), 1);
        assert_eq!(summary.total_medication_count, 1);
    }

    #[test]
    fn upsert_same_day_keeps_single_event_with_latest_status() {
        let mut store = MemoryStore {
            medications: vec![medication("m1", "Aspirin", true)],
            ..MemoryStore::default()
        };
        let m1 = MedicationId::new("m1").unwrap();
        store
            .upsert_event(&m1, today(), IntakeStatus::Missed, "forgot")
            .unwrap();
        store
            .upsert_event(&m1, today(), IntakeStatus::Late, "took at noon")
            .unwrap();

        let owner = UserId::new("user-1").unwrap();
        let summary = compute_dashboard(&store, &owner, today(), MedicationScope::All).unwrap();
        assert_eq!(
            summary.status_breakdown,
            StatusBreakdown {
                taken: 0,
                missed: 0,
                late: 1
            }
        );
    }

    #[derive(Debug, Error)]
    #[error("store unreachable")]
    struct Unreachable;

    struct DownStore;

    impl RecordStore for DownStore {
        type Error = Unreachable;

        fn find_medications_by_owner(
            &self,
            _owner_id: &UserId,
            _active_only: bool,
        ) -> Result<Vec<Medication>, Self::Error> {
            Err(Unreachable)
        }

        fn find_events_by_medication_ids(
            &self,
            _ids: &[MedicationId],
            _range: Option<DateRange>,
        ) -> Result<Vec<IntakeEvent>, Self::Error> {
            Err(Unreachable)
        }

        fn find_side_effects_by_medication_ids(
            &self,
            _ids: &[MedicationId],
        ) -> Result<Vec<SideEffect>, Self::Error> {
            Err(Unreachable)
        }

        fn upsert_event(
            &mut self,
            _medication_id: &MedicationId,
            _date: NaiveDate,
            _status: IntakeStatus,
            _notes: &str,
        ) -> Result<IntakeEvent, Self::Error> {
            Err(Unreachable)
        }
    }

    #[test]
    fn compute_dashboard_fails_wholesale_when_store_is_down() {
        let owner = UserId::new("user-1").unwrap();
        let result = compute_dashboard(&DownStore, &owner, today(), MedicationScope::All);
        assert!(result.is_err());
    }
}

//! Read-only clinician views of assigned patients.

use std::collections::HashMap;
use std::fmt::Write;

use anyhow::{Result, bail};
use serde::Serialize;

use mt_core::dashboard::adherence_score;
use mt_core::{MedicationId, PatientDetail, RecordStore, User, format_day};
use mt_db::Database;

use super::dashboard::format_percent;

/// One row of the clinician's patient list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRow {
    pub username: String,
    pub medication_count: usize,
    pub adherence_score: Option<u8>,
}

fn require_clinician(user: &User) -> Result<()> {
    if !user.is_clinician() {
        bail!("{} is not a clinician", user.username);
    }
    Ok(())
}

/// Loads a patient's full history for the detail view.
pub fn load_patient_detail(db: &Database, patient: User) -> Result<PatientDetail> {
    let medications = db.find_medications_by_owner(&patient.id, false)?;
    let ids: Vec<MedicationId> = medications.iter().map(|m| m.id.clone()).collect();
    let events = db.find_events_by_medication_ids(&ids, None)?;
    let side_effects = db.find_side_effects_by_medication_ids(&ids)?;
    tracing::debug!(
        patient = %patient.username,
        medications = medications.len(),
        events = events.len(),
        "loaded patient detail"
    );
    Ok(PatientDetail::new(patient, medications, events, side_effects))
}

/// Formats the patient detail as a human-readable report.
pub fn format_patient_detail(detail: &PatientDetail) -> String {
    let names: HashMap<&MedicationId, &str> = detail
        .medications
        .iter()
        .map(|m| (&m.id, m.name.as_str()))
        .collect();
    let name_of = |id: &MedicationId| names.get(id).copied().unwrap_or("Unknown");
    let mut output = String::new();

    writeln!(output, "Patient: {}", detail.patient.username).unwrap();
    writeln!(
        output,
        "Adherence score: {}",
        format_percent(detail.adherence_score)
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "Medications:").unwrap();
    if detail.medications.is_empty() {
        writeln!(output, "  (none)").unwrap();
    }
    for medication in &detail.medications {
        let status = if medication.is_active { "" } else { "  (inactive)" };
        writeln!(
            output,
            "  {}  {}, {}{status}",
            medication.name, medication.dosage, medication.frequency
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "Recent intake:").unwrap();
    if detail.recent_events.is_empty() {
        writeln!(output, "  (none)").unwrap();
    }
    for event in &detail.recent_events {
        writeln!(
            output,
            "  {}  {:<7} {}",
            format_day(event.date),
            event.status.as_str(),
            name_of(&event.medication_id)
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "Side effects:").unwrap();
    if detail.side_effects.is_empty() {
        writeln!(output, "  (none)").unwrap();
    }
    for side_effect in &detail.side_effects {
        writeln!(
            output,
            "  {}  [{}] {}  {}",
            format_day(side_effect.start_date),
            side_effect.severity,
            side_effect.effect,
            name_of(&side_effect.medication_id)
        )
        .unwrap();
    }

    output
}

/// Runs `mt patients`.
pub fn patients<W: std::io::Write>(
    writer: &mut W,
    db: &Database,
    clinician: &User,
    json: bool,
) -> Result<()> {
    require_clinician(clinician)?;

    let mut rows = Vec::new();
    for patient in db.list_patients_for_clinician(&clinician.id)? {
        let medications = db.find_medications_by_owner(&patient.id, false)?;
        let ids: Vec<MedicationId> = medications.iter().map(|m| m.id.clone()).collect();
        let events = db.find_events_by_medication_ids(&ids, None)?;
        rows.push(PatientRow {
            username: patient.username,
            medication_count: medications.len(),
            adherence_score: adherence_score(&events),
        });
    }

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(writer, "No patients assigned.")?;
        return Ok(());
    }
    for row in &rows {
        writeln!(
            writer,
            "{}  {} medications  adherence {}",
            row.username,
            row.medication_count,
            format_percent(row.adherence_score)
        )?;
    }
    Ok(())
}

/// Runs `mt patient <username>`.
pub fn patient<W: std::io::Write>(
    writer: &mut W,
    db: &Database,
    clinician: &User,
    username: &str,
    json: bool,
) -> Result<()> {
    require_clinician(clinician)?;

    let Some(patient) = db.find_assigned_patient(&clinician.id, username)? else {
        bail!("patient not found or not assigned: {username}");
    };
    let detail = load_patient_detail(db, patient)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&detail)?)?;
    } else {
        write!(writer, "{}", format_patient_detail(&detail))?;
    }
    Ok(())
}

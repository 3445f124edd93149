//! Medication commands: add, list, show, edit and deactivate.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use mt_core::{Medication, MedicationDraft, RecordStore, User, format_day};
use mt_db::Database;

use super::util::{owned_medication, parse_date, parse_optional_date, short_id};

/// Arguments for `mt med add`.
#[derive(Debug, Clone, Default)]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start: String,
    pub end: Option<String>,
    pub instructions: Option<String>,
}

/// Arguments for `mt med edit`. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct MedicationEdit {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub clear_end: bool,
    pub instructions: Option<String>,
}

// ========== Formatting ==========

fn format_span(medication: &Medication) -> String {
    match medication.end_date {
        Some(end) => format!("{} to {}", format_day(medication.start_date), format_day(end)),
        None => format!("since {}", format_day(medication.start_date)),
    }
}

/// One-line summary used by `med list`.
pub fn format_medication_line(medication: &Medication) -> String {
    let mut line = format!(
        "{}  {}  {}, {}  {}",
        short_id(medication.id.as_str()),
        medication.name,
        medication.dosage,
        medication.frequency,
        format_span(medication)
    );
    if !medication.is_active {
        line.push_str("  (inactive)");
    }
    line
}

/// Multi-line detail used by `med show`.
pub fn format_medication_detail(medication: &Medication) -> String {
    let mut out = String::new();
    writeln!(out, "{}", medication.name).unwrap();
    writeln!(out, "  id:           {}", medication.id).unwrap();
    writeln!(out, "  dosage:       {}", medication.dosage).unwrap();
    writeln!(out, "  frequency:    {}", medication.frequency).unwrap();
    writeln!(out, "  dates:        {}", format_span(medication)).unwrap();
    if !medication.instructions.is_empty() {
        writeln!(out, "  instructions: {}", medication.instructions).unwrap();
    }
    let status = if medication.is_active { "active" } else { "inactive" };
    writeln!(out, "  status:       {status}").unwrap();
    out
}

// ========== Commands ==========

/// Runs `mt med add`.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    input: &NewMedication,
    today: NaiveDate,
) -> Result<()> {
    let start = parse_date(&input.start, today)?;
    let end = parse_optional_date(input.end.as_deref(), today)?;
    let draft = MedicationDraft::new(
        &input.name,
        &input.dosage,
        &input.frequency,
        start,
        end,
        input.instructions.as_deref(),
    )?;
    let medication = db.insert_medication(&user.id, &draft)?;
    writeln!(writer, "Added {} ({})", medication.name, medication.id)?;
    Ok(())
}

/// Runs `mt med list`.
pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &User,
    include_inactive: bool,
    json: bool,
) -> Result<()> {
    let medications = db.find_medications_by_owner(&user.id, !include_inactive)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&medications)?)?;
        return Ok(());
    }

    if medications.is_empty() {
        writeln!(writer, "No medications.")?;
        return Ok(());
    }
    for medication in &medications {
        writeln!(writer, "{}", format_medication_line(medication))?;
    }
    Ok(())
}

/// Runs `mt med show`.
pub fn show<W: Write>(writer: &mut W, db: &Database, user: &User, id: &str, json: bool) -> Result<()> {
    let medication = owned_medication(db, user, id)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&medication)?)?;
    } else {
        write!(writer, "{}", format_medication_detail(&medication))?;
    }
    Ok(())
}

/// Runs `mt med edit`.
pub fn edit<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    id: &str,
    changes: &MedicationEdit,
    today: NaiveDate,
) -> Result<()> {
    let current = owned_medication(db, user, id)?;
    let mut next = current.to_draft();

    if let Some(name) = &changes.name {
        next.name.clone_from(name);
    }
    if let Some(dosage) = &changes.dosage {
        next.dosage.clone_from(dosage);
    }
    if let Some(frequency) = &changes.frequency {
        next.frequency.clone_from(frequency);
    }
    if let Some(start) = &changes.start {
        next.start_date = parse_date(start, today)?;
    }
    if changes.clear_end {
        next.end_date = None;
    } else if let Some(end) = &changes.end {
        next.end_date = Some(parse_date(end, today)?);
    }
    if let Some(instructions) = &changes.instructions {
        next.instructions.clone_from(instructions);
    }

    let draft = MedicationDraft::new(
        &next.name,
        &next.dosage,
        &next.frequency,
        next.start_date,
        next.end_date,
        Some(&next.instructions),
    )?;
    let updated = db.update_medication(&current.id, &draft)?;
    writeln!(writer, "Updated {}", format_medication_line(&updated))?;
    Ok(())
}

/// Runs `mt med deactivate`.
pub fn deactivate<W: Write>(writer: &mut W, db: &mut Database, user: &User, id: &str) -> Result<()> {
    let medication = owned_medication(db, user, id)?;
    db.set_medication_active(&medication.id, false)?;
    writeln!(writer, "Deactivated {}", medication.name)?;
    Ok(())
}

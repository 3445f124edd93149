//! Side effect commands: add, list, edit and delete.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use mt_core::{
    MedicationId, RecordStore, Severity, SideEffect, SideEffectDraft, User, format_day,
};
use mt_db::Database;

use super::util::{owned_medication, parse_date, parse_optional_date, short_id};

/// Arguments for `mt side-effect add`.
#[derive(Debug, Clone, Default)]
pub struct NewSideEffect {
    pub medication: String,
    pub effect: String,
    pub severity: i64,
    pub start: String,
    pub end: Option<String>,
    pub notes: Option<String>,
}

/// Arguments for `mt side-effect edit`. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SideEffectEdit {
    pub effect: Option<String>,
    pub severity: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub clear_end: bool,
    pub notes: Option<String>,
}

/// Loads a side effect, checking that its medication belongs to `user`.
///
/// Accepts a full id or any unique prefix, such as the short id from `side-effect list`.
fn owned_side_effect(db: &Database, user: &User, id: &str) -> Result<SideEffect> {
    let not_found = || format!("side effect not found: {id}");
    let id = db
        .resolve_side_effect_id(&user.id, id)?
        .with_context(not_found)?;
    db.get_side_effect(&id)?.with_context(not_found)
}

fn format_side_effect_line(side_effect: &SideEffect, medication_name: &str) -> String {
    let span = match side_effect.end_date {
        Some(end) => format!("{} to {}", format_day(side_effect.start_date), format_day(end)),
        None => format!("since {}", format_day(side_effect.start_date)),
    };
    format!(
        "{}  [{}/{}] {}  {}  {span}",
        short_id(side_effect.id.as_str()),
        side_effect.severity,
        Severity::MAX,
        side_effect.effect,
        medication_name
    )
}

/// Runs `mt side-effect add`.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    input: &NewSideEffect,
    today: NaiveDate,
) -> Result<()> {
    let medication = owned_medication(db, user, &input.medication)?;
    let draft = SideEffectDraft::new(
        &input.effect,
        Severity::new(input.severity)?,
        parse_date(&input.start, today)?,
        parse_optional_date(input.end.as_deref(), today)?,
        input.notes.as_deref(),
    )?;
    let side_effect = db.insert_side_effect(&medication.id, &draft)?;
    writeln!(
        writer,
        "Recorded {} for {} ({})",
        side_effect.effect, medication.name, side_effect.id
    )?;
    Ok(())
}

/// Runs `mt side-effect list`.
///
/// Lists side effects across all of the user's medications, or one medication.
pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &User,
    medication: Option<&str>,
    json: bool,
) -> Result<()> {
    let medications = match medication {
        Some(id) => vec![owned_medication(db, user, id)?],
        None => db.find_medications_by_owner(&user.id, false)?,
    };
    let names: HashMap<&MedicationId, &str> = medications
        .iter()
        .map(|m| (&m.id, m.name.as_str()))
        .collect();
    let ids: Vec<MedicationId> = medications.iter().map(|m| m.id.clone()).collect();
    let side_effects = db.find_side_effects_by_medication_ids(&ids)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&side_effects)?)?;
        return Ok(());
    }

    if side_effects.is_empty() {
        writeln!(writer, "No side effects recorded.")?;
        return Ok(());
    }
    for side_effect in &side_effects {
        let name = names
            .get(&side_effect.medication_id)
            .copied()
            .unwrap_or_default();
        writeln!(writer, "{}", format_side_effect_line(side_effect, name))?;
    }
    Ok(())
}

/// Runs `mt side-effect edit`.
pub fn edit<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    id: &str,
    changes: &SideEffectEdit,
    today: NaiveDate,
) -> Result<()> {
    let current = owned_side_effect(db, user, id)?;
    let mut next = current.to_draft();

    if let Some(effect) = &changes.effect {
        next.effect.clone_from(effect);
    }
    if let Some(severity) = changes.severity {
        next.severity = Severity::new(severity)?;
    }
    if let Some(start) = &changes.start {
        next.start_date = parse_date(start, today)?;
    }
    if changes.clear_end {
        next.end_date = None;
    } else if let Some(end) = &changes.end {
        next.end_date = Some(parse_date(end, today)?);
    }
    if let Some(notes) = &changes.notes {
        next.notes.clone_from(notes);
    }

    let draft = SideEffectDraft::new(
        &next.effect,
        next.severity,
        next.start_date,
        next.end_date,
        Some(&next.notes),
    )?;
    let updated = db.update_side_effect(&current.id, &draft)?;
    writeln!(
        writer,
        "Updated {} (severity {})",
        updated.effect, updated.severity
    )?;
    Ok(())
}

/// Runs `mt side-effect delete`.
pub fn delete<W: Write>(writer: &mut W, db: &mut Database, user: &User, id: &str) -> Result<()> {
    let side_effect = owned_side_effect(db, user, id)?;
    db.delete_side_effect(&side_effect.id)?;
    writeln!(writer, "Deleted {}", side_effect.effect)?;
    Ok(())
}

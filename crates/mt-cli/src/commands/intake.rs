//! Intake commands: log, list, edit and delete daily outcomes.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use mt_core::{
    DateRange, IntakeEvent, IntakeStatus, MedicationId, RecordStore, User, format_day,
};
use mt_db::Database;

use super::util::{owned_medication, parse_date, short_id};

/// An intake entry joined with its medication's name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeEntry {
    #[serde(flatten)]
    pub event: IntakeEvent,
    pub medication_name: String,
}

/// Arguments for `mt intake log`.
#[derive(Debug, Clone, Copy)]
pub struct NewIntake<'a> {
    pub medication: &'a str,
    pub status: IntakeStatus,
    pub date: &'a str,
    pub notes: &'a str,
}

/// Loads an intake event, checking that its medication belongs to `user`.
///
/// Accepts a full id or any unique prefix, such as the short id from `intake list`.
fn owned_event(db: &Database, user: &User, id: &str) -> Result<IntakeEvent> {
    let not_found = || format!("intake event not found: {id}");
    let id = db
        .resolve_intake_event_id(&user.id, id)?
        .with_context(not_found)?;
    db.get_intake_event(&id)?.with_context(not_found)
}

/// Intake for `date` across the user's active medications, ordered by medication name.
pub fn entries_for_day(db: &Database, user: &User, date: NaiveDate) -> Result<Vec<IntakeEntry>> {
    let medications = db.find_medications_by_owner(&user.id, true)?;
    let names: HashMap<&MedicationId, &str> = medications
        .iter()
        .map(|m| (&m.id, m.name.as_str()))
        .collect();
    let ids: Vec<MedicationId> = medications.iter().map(|m| m.id.clone()).collect();

    let events = db.find_events_by_medication_ids(&ids, Some(DateRange::new(date, date)?))?;
    let mut entries: Vec<IntakeEntry> = events
        .into_iter()
        .map(|event| IntakeEntry {
            medication_name: names
                .get(&event.medication_id)
                .map_or_else(String::new, |name| (*name).to_string()),
            event,
        })
        .collect();
    entries.sort_by(|a, b| a.medication_name.cmp(&b.medication_name));
    Ok(entries)
}

/// Runs `mt intake log`.
///
/// Logging the same medication and day twice keeps one entry with the latest status.
pub fn log<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    input: &NewIntake<'_>,
    today: NaiveDate,
) -> Result<()> {
    let medication = owned_medication(db, user, input.medication)?;
    let date = parse_date(input.date, today)?;
    let event = db.upsert_event(&medication.id, date, input.status, input.notes)?;
    writeln!(
        writer,
        "Logged {} as {} on {} ({})",
        medication.name,
        event.status,
        format_day(event.date),
        event.id
    )?;
    Ok(())
}

/// Runs `mt intake list`.
pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &User,
    date: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let entries = entries_for_day(db, user, date)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    writeln!(writer, "Intake for {}", format_day(date))?;
    if entries.is_empty() {
        writeln!(writer, "  Nothing logged.")?;
        return Ok(());
    }
    for entry in &entries {
        let notes = if entry.event.notes.is_empty() {
            String::new()
        } else {
            format!("  ({})", entry.event.notes)
        };
        writeln!(
            writer,
            "  {}  {:<7} {}{notes}",
            short_id(entry.event.id.as_str()),
            entry.event.status.as_str(),
            entry.medication_name
        )?;
    }
    Ok(())
}

/// Runs `mt intake edit`.
pub fn edit<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    id: &str,
    status: Option<IntakeStatus>,
    notes: Option<&str>,
) -> Result<()> {
    let event = owned_event(db, user, id)?;
    let status = status.unwrap_or(event.status);
    let notes = notes.unwrap_or(&event.notes);
    let updated = db.update_intake_event(&event.id, status, notes)?;
    writeln!(
        writer,
        "Updated intake on {} to {}",
        format_day(updated.date),
        updated.status
    )?;
    Ok(())
}

/// Runs `mt intake delete`.
pub fn delete<W: Write>(writer: &mut W, db: &mut Database, user: &User, id: &str) -> Result<()> {
    let event = owned_event(db, user, id)?;
    db.delete_intake_event(&event.id)?;
    writeln!(writer, "Deleted intake on {}", format_day(event.date))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use mt_core::{Medication, MedicationDraft, Role};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(2025, 3, 10)
    }

    fn setup() -> (Database, User, Medication) {
        let mut db = Database::open_in_memory().unwrap();
        let user = db.create_user("alice", Role::Patient).unwrap();
        let draft =
            MedicationDraft::new("Aspirin", "81mg", "Once daily", day(2025, 3, 1), None, None)
                .unwrap();
        let med = db.insert_medication(&user.id, &draft).unwrap();
        (db, user, med)
    }

    fn log_status(db: &mut Database, user: &User, med: &Medication, status: IntakeStatus, date: &str) {
        let mut output = Vec::new();
        let input = NewIntake {
            medication: med.id.as_str(),
            status,
            date,
            notes: "",
        };
        log(&mut output, db, user, &input, today()).unwrap();
    }

    #[test]
    fn log_twice_keeps_latest_status() {
        let (mut db, user, med) = setup();
        log_status(&mut db, &user, &med, IntakeStatus::Missed, "today");
        log_status(&mut db, &user, &med, IntakeStatus::Taken, "2025-03-10");

        let entries = entries_for_day(&db, &user, today()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event.status, IntakeStatus::Taken);
    }

    #[test]
    fn log_rejects_other_users_medication() {
        let (mut db, _, med) = setup();
        let bob = db.create_user("bob", Role::Patient).unwrap();

        let mut output = Vec::new();
        let input = NewIntake {
            medication: med.id.as_str(),
            status: IntakeStatus::Taken,
            date: "today",
            notes: "",
        };
        let err = log(&mut output, &mut db, &bob, &input, today()).unwrap_err();
        assert!(err.to_string().starts_with("medication not found"));
        assert!(
            db.find_events_by_medication_ids(&[med.id.clone()], None)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn log_rejects_malformed_date() {
        let (mut db, user, med) = setup();
        let mut output = Vec::new();
        let input = NewIntake {
            medication: med.id.as_str(),
            status: IntakeStatus::Taken,
            date: "03/10/2025",
            notes: "",
        };
        let result = log(&mut output, &mut db, &user, &input, today());
        assert!(result.is_err());
    }

    #[test]
    fn list_renders_day() {
        let (mut db, user, med) = setup();
        let mut output = Vec::new();
        let input = NewIntake {
            medication: med.id.as_str(),
            status: IntakeStatus::Late,
            date: "yesterday",
            notes: "after lunch",
        };
        log(&mut output, &mut db, &user, &input, today()).unwrap();
        let event_id = db
            .find_events_by_medication_ids(&[med.id.clone()], None)
            .unwrap()
            .remove(0)
            .id;

        let mut output = Vec::new();
        list(&mut output, &db, &user, "2025-03-09", false, today()).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(short_id(event_id.as_str()), "[ID]");
        assert_snapshot!(output, @r"
        Intake for 2025-03-09
          [ID]  late    Aspirin  (after lunch)
        ");
    }

    #[test]
    fn listed_short_id_can_be_edited_and_deleted() {
        let (mut db, user, med) = setup();
        log_status(&mut db, &user, &med, IntakeStatus::Missed, "today");
        let event = db
            .find_events_by_medication_ids(&[med.id.clone()], None)
            .unwrap()
            .remove(0);

        let mut output = Vec::new();
        list(&mut output, &db, &user, "today", false, today()).unwrap();
        let listed = String::from_utf8(output).unwrap();
        let short = listed
            .lines()
            .nth(1)
            .and_then(|line| line.split_whitespace().next())
            .unwrap()
            .to_string();
        assert_eq!(short, short_id(event.id.as_str()));

        let mut output = Vec::new();
        edit(&mut output, &mut db, &user, &short, Some(IntakeStatus::Late), None).unwrap();
        let edited = db.get_intake_event(&event.id).unwrap().unwrap();
        assert_eq!(edited.status, IntakeStatus::Late);

        delete(&mut output, &mut db, &user, &short).unwrap();
        assert!(db.get_intake_event(&event.id).unwrap().is_none());
    }

    #[test]
    fn list_excludes_inactive_medications() {
        let (mut db, user, med) = setup();
        log_status(&mut db, &user, &med, IntakeStatus::Taken, "today");
        db.set_medication_active(&med.id, false).unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, &user, "today", false, today()).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Intake for 2025-03-10\n  Nothing logged.\n"
        );
    }

    #[test]
    fn edit_and_delete_check_ownership() {
        let (mut db, user, med) = setup();
        log_status(&mut db, &user, &med, IntakeStatus::Missed, "today");
        let event = db
            .find_events_by_medication_ids(&[med.id.clone()], None)
            .unwrap()
            .remove(0);
        let bob = db.create_user("bob", Role::Patient).unwrap();

        let mut output = Vec::new();
        let err = edit(&mut output, &mut db, &bob, event.id.as_str(), Some(IntakeStatus::Taken), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("intake event not found"));
        assert!(delete(&mut output, &mut db, &bob, event.id.as_str()).is_err());

        edit(&mut output, &mut db, &user, event.id.as_str(), None, Some("forgot")).unwrap();
        let edited = db.get_intake_event(&event.id).unwrap().unwrap();
        assert_eq!(edited.status, IntakeStatus::Missed);
        assert_eq!(edited.notes, "forgot");

        delete(&mut output, &mut db, &user, event.id.as_str()).unwrap();
        assert!(db.get_intake_event(&event.id).unwrap().is_none());
    }
}

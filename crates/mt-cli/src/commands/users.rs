//! User registration and clinician assignment.

use std::io::Write;

use anyhow::{Context, Result, bail};

use mt_core::Role;
use mt_db::Database;

/// Runs `mt user add`.
pub fn add<W: Write>(writer: &mut W, db: &mut Database, username: &str, role: Role) -> Result<()> {
    let user = db
        .create_user(username, role)
        .with_context(|| format!("failed to create user {username}"))?;
    writeln!(writer, "Created {} {} ({})", user.role, user.username, user.id)?;
    Ok(())
}

/// Runs `mt user assign`.
pub fn assign<W: Write>(
    writer: &mut W,
    db: &mut Database,
    patient: &str,
    clinician: &str,
) -> Result<()> {
    let patient_user = db
        .find_user_by_username(patient)?
        .with_context(|| format!("unknown user: {patient}"))?;
    let clinician_user = db
        .find_user_by_username(clinician)?
        .with_context(|| format!("unknown user: {clinician}"))?;

    if patient_user.is_clinician() {
        bail!("{patient} is a clinician, not a patient");
    }
    if !clinician_user.is_clinician() {
        bail!("{clinician} is not a clinician");
    }

    db.assign_clinician(&patient_user.id, &clinician_user.id)?;
    writeln!(writer, "Assigned {patient} to {clinician}")?;
    Ok(())
}

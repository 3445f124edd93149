//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;

use mt_core::{Medication, User};
use mt_db::Database;

/// Pre-compiled regex for relative day parsing.
static RELATIVE_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(day|week)s?\s+ago$").unwrap());

/// Conservative bound for relative day parsing (~1000 years).
const MAX_RELATIVE_DAYS: i64 = 1000 * 365;

/// The current UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a calendar day relative to `today`.
///
/// Supports:
/// - Plain dates: "2025-03-10"
/// - RFC 3339: "2025-03-10T23:30:00-05:00" (normalized to the UTC day)
/// - Keywords: "today", "yesterday"
/// - Relative: "3 days ago", "1 week ago"
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = input.trim();
    match trimmed {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE_DAY_RE.captures(trimmed) {
        let n: i64 = caps[1]
            .parse()
            .context("failed to parse number in relative date")?;
        let days_per_unit = match &caps[2] {
            "day" => 1,
            "week" => 7,
            unit => bail!("Unknown date unit: {unit}"),
        };
        if n > MAX_RELATIVE_DAYS / days_per_unit {
            bail!("Relative date value too large: {n} {}", &caps[2]);
        }
        return Ok(today - Duration::days(n * days_per_unit));
    }

    mt_core::parse_day(trimmed).map_err(|_| {
        anyhow::anyhow!(
            "Invalid date: {input}. Use YYYY-MM-DD, RFC 3339, 'today', 'yesterday' or relative (e.g., '3 days ago')"
        )
    })
}

/// Parse an optional date argument.
pub fn parse_optional_date(input: Option<&str>, today: NaiveDate) -> Result<Option<NaiveDate>> {
    input.map(|s| parse_date(s, today)).transpose()
}

/// Resolve the acting user from `--user` or the configured default.
pub fn acting_user(db: &Database, username: Option<&str>) -> Result<User> {
    let Some(username) = username else {
        bail!("No user selected. Pass --user <name> or set `user` in the config file");
    };
    let user = db
        .find_user_by_username(username)?
        .with_context(|| format!("unknown user: {username}"))?;
    if !user.is_active {
        bail!("user {username} is deactivated");
    }
    Ok(user)
}

/// Load a medication owned by `user`, hiding other users' medications.
///
/// Accepts a full id or any unique prefix, such as the short id from `med list`.
pub fn owned_medication(db: &Database, user: &User, id: &str) -> Result<Medication> {
    let not_found = || format!("medication not found: {id}");
    let id = db
        .resolve_medication_id(&user.id, id)?
        .with_context(not_found)?;
    db.find_medication_for_owner(&id, &user.id)?
        .with_context(not_found)
}

/// Shorten a UUID for table output. Commands taking an id accept the short form.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

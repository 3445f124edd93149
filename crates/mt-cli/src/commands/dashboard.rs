//! Dashboard command: adherence summary for the acting user.
//!
//! Renders the aggregator's [`DashboardSummary`] either as a text report or
//! as camelCase JSON.

use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;

use mt_core::{DashboardSummary, MedicationScope, User, compute_dashboard, format_day};
use mt_db::Database;

const BAR_WIDTH: usize = 10;

// ========== Formatting ==========

/// Formats an optional percentage, `-` when there is no data.
pub fn format_percent(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |p| format!("{p}%"))
}

/// Generates a 10-character bar for a percentage, rounded to the nearest block.
pub fn adherence_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) + 5) / 10;
    format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    )
}

/// Formats the dashboard as a human-readable report.
pub fn format_dashboard(username: &str, summary: &DashboardSummary) -> String {
    let mut output = String::new();

    writeln!(output, "Dashboard for {username} ({})", format_day(summary.today)).unwrap();
    writeln!(
        output,
        "Adherence score: {}",
        format_percent(summary.adherence_score)
    )
    .unwrap();
    let breakdown = &summary.status_breakdown;
    writeln!(
        output,
        "Intake: {} taken, {} missed, {} late",
        breakdown.taken, breakdown.missed, breakdown.late
    )
    .unwrap();
    match &summary.most_missed_medication {
        Some(top) => writeln!(output, "Most missed: {} ({} missed)", top.name, top.miss_count),
        None => writeln!(output, "Most missed: none"),
    }
    .unwrap();
    let unit = if summary.missed_dose_streak == 1 { "day" } else { "days" };
    writeln!(
        output,
        "Missed-dose streak: {} {unit}",
        summary.missed_dose_streak
    )
    .unwrap();
    writeln!(
        output,
        "Medications: {} active of {}",
        summary.active_medication_count, summary.total_medication_count
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "Last {} days:", summary.weekly_trend.len()).unwrap();
    for point in &summary.weekly_trend {
        match point.adherence {
            Some(percent) => writeln!(
                output,
                "  {:<11}  {} {:>4}",
                point.label,
                adherence_bar(percent),
                format_percent(Some(percent))
            ),
            None => writeln!(output, "  {:<11}  no data", point.label),
        }
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "Side effect severity:").unwrap();
    for (index, count) in summary.severity_histogram.iter().enumerate() {
        writeln!(output, "  {}  {count}", index + 1).unwrap();
    }

    output
}

/// Formats the dashboard as JSON.
pub fn format_dashboard_json(summary: &DashboardSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

// ========== Public Interface ==========

/// Runs the dashboard command.
pub fn run<W: std::io::Write>(
    writer: &mut W,
    db: &Database,
    user: &User,
    today: NaiveDate,
    scope: MedicationScope,
    json: bool,
) -> Result<()> {
    let summary = compute_dashboard(db, &user.id, today, scope)?;

    if json {
        writeln!(writer, "{}", format_dashboard_json(&summary)?)?;
    } else {
        write!(writer, "{}", format_dashboard(&user.username, &summary))?;
    }
    Ok(())
}

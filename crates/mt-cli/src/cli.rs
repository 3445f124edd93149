//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mt_core::{IntakeStatus, Role};

/// Medication adherence tracker.
///
/// Records medications, daily intake outcomes and side effects, and
/// summarizes adherence on a dashboard.
#[derive(Debug, Parser)]
#[command(name = "mt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user (overrides `user` from config).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage users and clinician assignments.
    #[command(subcommand)]
    User(UserAction),

    /// Manage medications.
    #[command(subcommand)]
    Med(MedAction),

    /// Log and review daily intake.
    #[command(subcommand)]
    Intake(IntakeAction),

    /// Record and review side effects.
    #[command(subcommand)]
    SideEffect(SideEffectAction),

    /// Show the adherence dashboard.
    Dashboard {
        /// Day treated as today (YYYY-MM-DD, RFC 3339, `yesterday`, `N days ago`).
        #[arg(long)]
        today: Option<String>,

        /// Only aggregate medications that are still active.
        #[arg(long)]
        active_only: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List patients assigned to you (clinicians only).
    Patients {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one assigned patient's records (clinicians only).
    Patient {
        /// The patient's username.
        username: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a user.
    Add {
        username: String,

        #[arg(long, default_value = "patient")]
        role: Role,
    },

    /// Assign a patient to a clinician.
    Assign { patient: String, clinician: String },
}

#[derive(Debug, Subcommand)]
pub enum MedAction {
    /// Add a medication.
    Add {
        name: String,

        /// Dose per intake (e.g., 10mg).
        #[arg(long)]
        dosage: String,

        /// How often it is taken (e.g., "twice daily").
        #[arg(long)]
        frequency: String,

        #[arg(long, default_value = "today")]
        start: String,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        instructions: Option<String>,
    },

    /// List your medications.
    List {
        /// Include deactivated medications.
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show one medication.
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Change a medication's details.
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        frequency: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long, conflicts_with = "clear_end")]
        end: Option<String>,

        /// Remove the end date.
        #[arg(long)]
        clear_end: bool,

        #[arg(long)]
        instructions: Option<String>,
    },

    /// Deactivate a medication, keeping its history.
    Deactivate { id: String },
}

#[derive(Debug, Subcommand)]
pub enum IntakeAction {
    /// Record the outcome for a medication on a day.
    ///
    /// Logging the same medication and day again replaces the earlier entry.
    Log {
        medication: String,

        /// taken, missed or late.
        status: IntakeStatus,

        #[arg(long, default_value = "today")]
        date: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List intake for one day across your active medications.
    List {
        #[arg(long, default_value = "today")]
        date: String,

        #[arg(long)]
        json: bool,
    },

    /// Change the status or notes of a logged intake.
    Edit {
        id: String,

        #[arg(long)]
        status: Option<IntakeStatus>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a logged intake.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SideEffectAction {
    /// Record a side effect for a medication.
    Add {
        medication: String,

        effect: String,

        /// 1 (mild) to 5 (severe).
        #[arg(long)]
        severity: i64,

        #[arg(long, default_value = "today")]
        start: String,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List side effects, optionally for one medication.
    List {
        #[arg(long)]
        medication: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Change a side effect's details.
    Edit {
        id: String,

        #[arg(long)]
        effect: Option<String>,

        #[arg(long)]
        severity: Option<i64>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long, conflicts_with = "clear_end")]
        end: Option<String>,

        /// Mark the side effect as ongoing again.
        #[arg(long)]
        clear_end: bool,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a side effect.
    Delete { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_intake_log_with_status() {
        let cli = Cli::parse_from([
            "mt", "--user", "alice", "intake", "log", "med-1", "missed", "--date", "yesterday",
        ]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        let Some(Commands::Intake(IntakeAction::Log {
            medication,
            status,
            date,
            notes,
        })) = cli.command
        else {
            panic!("expected intake log");
        };
        assert_eq!(medication, "med-1");
        assert_eq!(status, IntakeStatus::Missed);
        assert_eq!(date, "yesterday");
        assert_eq!(notes, "");
    }

    #[test]
    fn rejects_unknown_intake_status() {
        let result = Cli::try_parse_from(["mt", "intake", "log", "med-1", "skipped"]);
        assert!(result.is_err());
    }

    #[test]
    fn user_add_defaults_to_patient() {
        let cli = Cli::parse_from(["mt", "user", "add", "alice"]);
        assert!(matches!(
            cli.command,
            Some(Commands::User(UserAction::Add {
                role: Role::Patient,
                ..
            }))
        ));
    }

    #[test]
    fn edit_end_conflicts_with_clear_end() {
        let result = Cli::try_parse_from([
            "mt", "med", "edit", "m1", "--end", "2025-01-01", "--clear-end",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "mt",
            "side-effect",
            "edit",
            "se1",
            "--end",
            "2025-01-01",
            "--clear-end",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_side_effect_clear_end() {
        let cli = Cli::parse_from(["mt", "side-effect", "edit", "se1", "--clear-end"]);
        assert!(matches!(
            cli.command,
            Some(Commands::SideEffect(SideEffectAction::Edit {
                clear_end: true,
                end: None,
                ..
            }))
        ));
    }
}

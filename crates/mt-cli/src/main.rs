use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mt_cli::commands::{clinician, dashboard, intake, meds, side_effects, users, util};
use mt_cli::{Cli, Commands, Config, IntakeAction, MedAction, SideEffectAction, UserAction};
use mt_core::MedicationScope;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(mt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = mt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let username = cli.user.as_deref().or(config.user.as_deref());
    let today = util::today();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::User(action) => match action {
            UserAction::Add { username, role } => users::add(&mut out, &mut db, username, *role)?,
            UserAction::Assign { patient, clinician } => {
                users::assign(&mut out, &mut db, patient, clinician)?;
            }
        },
        Commands::Med(action) => {
            let user = util::acting_user(&db, username)?;
            match action {
                MedAction::Add {
                    name,
                    dosage,
                    frequency,
                    start,
                    end,
                    instructions,
                } => {
                    let input = meds::NewMedication {
                        name: name.clone(),
                        dosage: dosage.clone(),
                        frequency: frequency.clone(),
                        start: start.clone(),
                        end: end.clone(),
                        instructions: instructions.clone(),
                    };
                    meds::add(&mut out, &mut db, &user, &input, today)?;
                }
                MedAction::List { all, json } => meds::list(&mut out, &db, &user, *all, *json)?,
                MedAction::Show { id, json } => meds::show(&mut out, &db, &user, id, *json)?,
                MedAction::Edit {
                    id,
                    name,
                    dosage,
                    frequency,
                    start,
                    end,
                    clear_end,
                    instructions,
                } => {
                    let changes = meds::MedicationEdit {
                        name: name.clone(),
                        dosage: dosage.clone(),
                        frequency: frequency.clone(),
                        start: start.clone(),
                        end: end.clone(),
                        clear_end: *clear_end,
                        instructions: instructions.clone(),
                    };
                    meds::edit(&mut out, &mut db, &user, id, &changes, today)?;
                }
                MedAction::Deactivate { id } => meds::deactivate(&mut out, &mut db, &user, id)?,
            }
        }
        Commands::Intake(action) => {
            let user = util::acting_user(&db, username)?;
            match action {
                IntakeAction::Log {
                    medication,
                    status,
                    date,
                    notes,
                } => {
                    let input = intake::NewIntake {
                        medication,
                        status: *status,
                        date,
                        notes,
                    };
                    intake::log(&mut out, &mut db, &user, &input, today)?;
                }
                IntakeAction::List { date, json } => {
                    intake::list(&mut out, &db, &user, date, *json, today)?;
                }
                IntakeAction::Edit { id, status, notes } => {
                    intake::edit(&mut out, &mut db, &user, id, *status, notes.as_deref())?;
                }
                IntakeAction::Delete { id } => intake::delete(&mut out, &mut db, &user, id)?,
            }
        }
        Commands::SideEffect(action) => {
            let user = util::acting_user(&db, username)?;
            match action {
                SideEffectAction::Add {
                    medication,
                    effect,
                    severity,
                    start,
                    end,
                    notes,
                } => {
                    let input = side_effects::NewSideEffect {
                        medication: medication.clone(),
                        effect: effect.clone(),
                        severity: *severity,
                        start: start.clone(),
                        end: end.clone(),
                        notes: notes.clone(),
                    };
                    side_effects::add(&mut out, &mut db, &user, &input, today)?;
                }
                SideEffectAction::List { medication, json } => {
                    side_effects::list(&mut out, &db, &user, medication.as_deref(), *json)?;
                }
                SideEffectAction::Edit {
                    id,
                    effect,
                    severity,
                    start,
                    end,
                    clear_end,
                    notes,
                } => {
                    let changes = side_effects::SideEffectEdit {
                        effect: effect.clone(),
                        severity: *severity,
                        start: start.clone(),
                        end: end.clone(),
                        clear_end: *clear_end,
                        notes: notes.clone(),
                    };
                    side_effects::edit(&mut out, &mut db, &user, id, &changes, today)?;
                }
                SideEffectAction::Delete { id } => {
                    side_effects::delete(&mut out, &mut db, &user, id)?;
                }
            }
        }
        Commands::Dashboard {
            today: as_of,
            active_only,
            json,
        } => {
            let user = util::acting_user(&db, username)?;
            let as_of = match as_of {
                Some(input) => util::parse_date(input, today)?,
                None => today,
            };
            let scope = if *active_only || config.active_only {
                MedicationScope::ActiveOnly
            } else {
                MedicationScope::All
            };
            dashboard::run(&mut out, &db, &user, as_of, scope, *json)?;
        }
        Commands::Patients { json } => {
            let user = util::acting_user(&db, username)?;
            clinician::patients(&mut out, &db, &user, *json)?;
        }
        Commands::Patient { username: patient, json } => {
            let user = util::acting_user(&db, username)?;
            clinician::patient(&mut out, &db, &user, patient, *json)?;
        }
    }

    out.flush()?;
    Ok(())
}

//! CLI subcommand implementations.

pub mod clinician;
pub mod dashboard;
pub mod intake;
pub mod meds;
pub mod side_effects;
pub mod users;
pub mod util;

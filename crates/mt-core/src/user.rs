//! User accounts and clinician assignment.

use serde::{Deserialize, Serialize};

use crate::types::{Role, UserId};

/// A patient or clinician account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    /// The clinician this patient is assigned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_clinician_id: Option<UserId>,
    pub is_active: bool,
}

impl User {
    pub fn is_clinician(&self) -> bool {
        self.role == Role::Clinician
    }
}

//! Storage layer for the medication adherence tracker.
//!
//! Provides persistence for users, medications, intake events and side
//! effects using `rusqlite`, and implements [`RecordStore`] so the dashboard
//! aggregator can read from it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The CLI opens one
//! connection per invocation.
//!
//! # Schema
//!
//! ## Date Format
//!
//! Calendar days (`date`, `start_date`, `end_date`) are stored as TEXT in
//! `YYYY-MM-DD` form, so lexicographic ordering matches chronological
//! ordering and range filters can use `BETWEEN`. Days are UTC calendar days.
//!
//! ## Timestamp Format
//!
//! Bookkeeping timestamps (`created_at`, `updated_at`) are stored as TEXT in
//! RFC 3339 with millisecond precision (e.g., `2025-01-15T10:30:00.000Z`).
//!
//! ## Intake Uniqueness
//!
//! `intake_events` carries `UNIQUE (medication_id, date)`. Logging an intake
//! for a pair that already exists updates the row in place.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;
use uuid::Uuid;

use mt_core::calendar::{DAY_FORMAT, DateRange, format_day};
use mt_core::{
    IntakeEvent, IntakeEventId, IntakeStatus, Medication, MedicationDraft, MedicationId,
    RecordStore, Role, Severity, SideEffect, SideEffectDraft, SideEffectId, User, UserId,
    ValidationError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored or supplied value failed domain validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// An abbreviated id matches more than one record.
    #[error("ambiguous {entity} id: {prefix} matches more than one record")]
    AmbiguousId {
        entity: &'static str,
        prefix: String,
    },
    /// The username is already registered.
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    /// A stored calendar day could not be parsed.
    #[error("invalid {column} value: {value}")]
    InvalidDate {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

const USER_COLUMNS: &str = "id, username, role, assigned_clinician_id, is_active";
const MEDICATION_COLUMNS: &str = "id, owner_id, name, dosage, frequency, start_date, end_date, instructions, is_active, created_at";
const INTAKE_COLUMNS: &str = "id, medication_id, date, status, notes";
const SIDE_EFFECT_COLUMNS: &str =
    "id, medication_id, effect, severity, start_date, end_date, notes";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'patient',
                assigned_clinician_id TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (assigned_clinician_id) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_clinician ON users(assigned_clinician_id);

            -- Medications are never deleted; is_active = 0 hides them from default lists
            CREATE TABLE IF NOT EXISTS medications (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                dosage TEXT NOT NULL,
                frequency TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT,
                instructions TEXT NOT NULL DEFAULT '',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_medications_owner ON medications(owner_id);

            -- date: UTC calendar day, 'YYYY-MM-DD'
            CREATE TABLE IF NOT EXISTS intake_events (
                id TEXT PRIMARY KEY,
                medication_id TEXT NOT NULL,
                date TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('taken', 'missed', 'late')),
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (medication_id, date),
                FOREIGN KEY (medication_id) REFERENCES medications(id)
            );

            CREATE INDEX IF NOT EXISTS idx_intake_events_date ON intake_events(date);

            CREATE TABLE IF NOT EXISTS side_effects (
                id TEXT PRIMARY KEY,
                medication_id TEXT NOT NULL,
                effect TEXT NOT NULL,
                severity INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
                start_date TEXT NOT NULL,
                end_date TEXT,
                notes TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (medication_id) REFERENCES medications(id)
            );

            CREATE INDEX IF NOT EXISTS idx_side_effects_medication ON side_effects(medication_id);
            ",
        )?;
        Ok(())
    }

    // ========== Users ==========

    /// Registers a new user.
    pub fn create_user(&mut self, username: &str, role: Role) -> Result<User, DbError> {
        let username = mt_core::types::required_text(username, "username")?;
        if self.find_user_by_username(&username)?.is_some() {
            return Err(DbError::UsernameTaken(username));
        }
        let user = User {
            id: UserId::new(new_id())?,
            username,
            role,
            assigned_clinician_id: None,
            is_active: true,
        };
        self.conn.execute(
            "INSERT INTO users (id, username, role, assigned_clinician_id, is_active) VALUES (?, ?, ?, NULL, 1)",
            params![user.id.as_str(), user.username, user.role.as_str()],
        )?;
        tracing::info!(user = %user.username, role = %user.role, "created user");
        Ok(user)
    }

    /// Looks up a user by username.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"),
                [username],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    /// Looks up a user by id.
    pub fn get_user(&self, id: &UserId) -> Result<Option<User>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                [id.as_str()],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    /// Assigns a patient to a clinician, replacing any previous assignment.
    pub fn assign_clinician(&mut self, patient: &UserId, clinician: &UserId) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "UPDATE users SET assigned_clinician_id = ? WHERE id = ?",
            params![clinician.as_str(), patient.as_str()],
        )?;
        if updated == 0 {
            return Err(not_found("user", patient.as_str()));
        }
        tracing::info!(%patient, %clinician, "assigned clinician");
        Ok(())
    }

    /// Lists active patients assigned to a clinician, ordered by username.
    pub fn list_patients_for_clinician(&self, clinician: &UserId) -> Result<Vec<User>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {USER_COLUMNS}
            FROM users
            WHERE role = 'patient' AND assigned_clinician_id = ? AND is_active = 1
            ORDER BY username ASC
            "
        ))?;
        let rows = stmt.query_map([clinician.as_str()], UserRow::from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?.into_user()?);
        }
        Ok(users)
    }

    /// Finds a patient by username, but only if assigned to the clinician.
    pub fn find_assigned_patient(
        &self,
        clinician: &UserId,
        username: &str,
    ) -> Result<Option<User>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND role = 'patient' AND assigned_clinician_id = ?"
                ),
                [username, clinician.as_str()],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    // ========== Medications ==========

    /// Adds a medication for an owner. New medications are active.
    pub fn insert_medication(
        &mut self,
        owner: &UserId,
        draft: &MedicationDraft,
    ) -> Result<Medication, DbError> {
        self.insert_medication_at(owner, draft, Utc::now())
    }

    fn insert_medication_at(
        &mut self,
        owner: &UserId,
        draft: &MedicationDraft,
        now: DateTime<Utc>,
    ) -> Result<Medication, DbError> {
        let medication = Medication {
            id: MedicationId::new(new_id())?,
            owner_id: owner.clone(),
            name: draft.name.clone(),
            dosage: draft.dosage.clone(),
            frequency: draft.frequency.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            instructions: draft.instructions.clone(),
            is_active: true,
            created_at: now,
        };
        self.conn.execute(
            "
            INSERT INTO medications
            (id, owner_id, name, dosage, frequency, start_date, end_date, instructions, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            ",
            params![
                medication.id.as_str(),
                medication.owner_id.as_str(),
                medication.name,
                medication.dosage,
                medication.frequency,
                format_day(medication.start_date),
                medication.end_date.map(format_day),
                medication.instructions,
                format_timestamp(medication.created_at),
            ],
        )?;
        tracing::info!(medication = %medication.id, owner = %owner, "added medication");
        Ok(medication)
    }

    /// Looks up a medication by id.
    pub fn get_medication(&self, id: &MedicationId) -> Result<Option<Medication>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?"),
                [id.as_str()],
                MedicationRow::from_row,
            )
            .optional()?;
        row.map(MedicationRow::into_medication).transpose()
    }

    /// Looks up a medication only if it belongs to `owner`.
    pub fn find_medication_for_owner(
        &self,
        id: &MedicationId,
        owner: &UserId,
    ) -> Result<Option<Medication>, DbError> {
        Ok(self
            .get_medication(id)?
            .filter(|medication| &medication.owner_id == owner))
    }

    /// Replaces a medication's details. The active flag is left unchanged.
    pub fn update_medication(
        &mut self,
        id: &MedicationId,
        draft: &MedicationDraft,
    ) -> Result<Medication, DbError> {
        let updated = self.conn.execute(
            "
            UPDATE medications
            SET name = ?, dosage = ?, frequency = ?, start_date = ?, end_date = ?, instructions = ?
            WHERE id = ?
            ",
            params![
                draft.name,
                draft.dosage,
                draft.frequency,
                format_day(draft.start_date),
                draft.end_date.map(format_day),
                draft.instructions,
                id.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(not_found("medication", id.as_str()));
        }
        tracing::info!(medication = %id, "updated medication");
        self.get_medication(id)?
            .ok_or_else(|| not_found("medication", id.as_str()))
    }

    /// Sets the active flag. Deactivating keeps all intake and side effect history.
    pub fn set_medication_active(&mut self, id: &MedicationId, active: bool) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "UPDATE medications SET is_active = ? WHERE id = ?",
            params![active, id.as_str()],
        )?;
        if updated == 0 {
            return Err(not_found("medication", id.as_str()));
        }
        tracing::info!(medication = %id, active, "set medication active flag");
        Ok(())
    }

    // ========== Intake events ==========

    /// Looks up an intake event by id.
    pub fn get_intake_event(&self, id: &IntakeEventId) -> Result<Option<IntakeEvent>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {INTAKE_COLUMNS} FROM intake_events WHERE id = ?"),
                [id.as_str()],
                IntakeRow::from_row,
            )
            .optional()?;
        row.map(IntakeRow::into_event).transpose()
    }

    /// Changes the status and notes of an existing intake event.
    pub fn update_intake_event(
        &mut self,
        id: &IntakeEventId,
        status: IntakeStatus,
        notes: &str,
    ) -> Result<IntakeEvent, DbError> {
        let updated = self.conn.execute(
            "UPDATE intake_events SET status = ?, notes = ?, updated_at = ? WHERE id = ?",
            params![
                status.as_str(),
                notes.trim(),
                format_timestamp(Utc::now()),
                id.as_str()
            ],
        )?;
        if updated == 0 {
            return Err(not_found("intake event", id.as_str()));
        }
        tracing::info!(event = %id, %status, "updated intake event");
        self.get_intake_event(id)?
            .ok_or_else(|| not_found("intake event", id.as_str()))
    }

    /// Removes an intake event.
    pub fn delete_intake_event(&mut self, id: &IntakeEventId) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM intake_events WHERE id = ?", [id.as_str()])?;
        if deleted == 0 {
            return Err(not_found("intake event", id.as_str()));
        }
        tracing::info!(event = %id, "deleted intake event");
        Ok(())
    }

    // ========== Side effects ==========

    /// Records a side effect against a medication.
    pub fn insert_side_effect(
        &mut self,
        medication_id: &MedicationId,
        draft: &SideEffectDraft,
    ) -> Result<SideEffect, DbError> {
        let side_effect = SideEffect {
            id: SideEffectId::new(new_id())?,
            medication_id: medication_id.clone(),
            effect: draft.effect.clone(),
            severity: draft.severity,
            start_date: draft.start_date,
            end_date: draft.end_date,
            notes: draft.notes.clone(),
        };
        self.conn.execute(
            "
            INSERT INTO side_effects (id, medication_id, effect, severity, start_date, end_date, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                side_effect.id.as_str(),
                side_effect.medication_id.as_str(),
                side_effect.effect,
                i64::from(side_effect.severity),
                format_day(side_effect.start_date),
                side_effect.end_date.map(format_day),
                side_effect.notes,
            ],
        )?;
        tracing::info!(
            side_effect = %side_effect.id,
            medication = %medication_id,
            severity = %side_effect.severity,
            "recorded side effect"
        );
        Ok(side_effect)
    }

    /// Looks up a side effect by id.
    pub fn get_side_effect(&self, id: &SideEffectId) -> Result<Option<SideEffect>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SIDE_EFFECT_COLUMNS} FROM side_effects WHERE id = ?"),
                [id.as_str()],
                SideEffectRow::from_row,
            )
            .optional()?;
        row.map(SideEffectRow::into_side_effect).transpose()
    }

    /// Replaces a side effect's details.
    pub fn update_side_effect(
        &mut self,
        id: &SideEffectId,
        draft: &SideEffectDraft,
    ) -> Result<SideEffect, DbError> {
        let updated = self.conn.execute(
            "
            UPDATE side_effects
            SET effect = ?, severity = ?, start_date = ?, end_date = ?, notes = ?
            WHERE id = ?
            ",
            params![
                draft.effect,
                i64::from(draft.severity),
                format_day(draft.start_date),
                draft.end_date.map(format_day),
                draft.notes,
                id.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(not_found("side effect", id.as_str()));
        }
        tracing::info!(side_effect = %id, "updated side effect");
        self.get_side_effect(id)?
            .ok_or_else(|| not_found("side effect", id.as_str()))
    }

    /// Removes a side effect.
    pub fn delete_side_effect(&mut self, id: &SideEffectId) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM side_effects WHERE id = ?", [id.as_str()])?;
        if deleted == 0 {
            return Err(not_found("side effect", id.as_str()));
        }
        tracing::info!(side_effect = %id, "deleted side effect");
        Ok(())
    }

    // ========== Id prefixes ==========

    /// Resolves a full or abbreviated id among `owner`'s medications.
    pub fn resolve_medication_id(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<Option<MedicationId>, DbError> {
        let id = self.resolve_id_prefix(
            "
            SELECT id FROM medications
            WHERE owner_id = ?1 AND substr(id, 1, length(?2)) = ?2
            LIMIT 2
            ",
            "medication",
            owner,
            prefix,
        )?;
        Ok(id.map(MedicationId::new).transpose()?)
    }

    /// Resolves a full or abbreviated id among intake events on `owner`'s medications.
    pub fn resolve_intake_event_id(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<Option<IntakeEventId>, DbError> {
        let id = self.resolve_id_prefix(
            "
            SELECT e.id FROM intake_events e
            JOIN medications m ON m.id = e.medication_id
            WHERE m.owner_id = ?1 AND substr(e.id, 1, length(?2)) = ?2
            LIMIT 2
            ",
            "intake event",
            owner,
            prefix,
        )?;
        Ok(id.map(IntakeEventId::new).transpose()?)
    }

    /// Resolves a full or abbreviated id among side effects on `owner`'s medications.
    pub fn resolve_side_effect_id(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<Option<SideEffectId>, DbError> {
        let id = self.resolve_id_prefix(
            "
            SELECT s.id FROM side_effects s
            JOIN medications m ON m.id = s.medication_id
            WHERE m.owner_id = ?1 AND substr(s.id, 1, length(?2)) = ?2
            LIMIT 2
            ",
            "side effect",
            owner,
            prefix,
        )?;
        Ok(id.map(SideEffectId::new).transpose()?)
    }

    /// Runs a prefix query bound to `(owner, prefix)`. More than one hit is an error.
    fn resolve_id_prefix(
        &self,
        sql: &str,
        entity: &'static str,
        owner: &UserId,
        prefix: &str,
    ) -> Result<Option<String>, DbError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![owner.as_str(), prefix], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(id.clone())),
            _ => Err(DbError::AmbiguousId {
                entity,
                prefix: prefix.to_string(),
            }),
        }
    }
}

impl RecordStore for Database {
    type Error = DbError;

    fn find_medications_by_owner(
        &self,
        owner_id: &UserId,
        active_only: bool,
    ) -> Result<Vec<Medication>, DbError> {
        let filter = if active_only { "AND is_active = 1" } else { "" };
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE owner_id = ? {filter}
            ORDER BY created_at DESC, id ASC
            "
        ))?;
        let rows = stmt.query_map([owner_id.as_str()], MedicationRow::from_row)?;
        let mut medications = Vec::new();
        for row in rows {
            medications.push(row?.into_medication()?);
        }
        tracing::debug!(owner = %owner_id, active_only, count = medications.len(), "loaded medications");
        Ok(medications)
    }

    fn find_events_by_medication_ids(
        &self,
        ids: &[MedicationId],
        range: Option<DateRange>,
    ) -> Result<Vec<IntakeEvent>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let mut sql = format!(
            "SELECT {INTAKE_COLUMNS} FROM intake_events WHERE medication_id IN ({})",
            placeholders(ids.len())
        );
        if let Some(range) = range {
            sql.push_str(" AND date BETWEEN ? AND ?");
            values.push(format_day(range.start));
            values.push(format_day(range.end));
        }
        sql.push_str(" ORDER BY date DESC, medication_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), IntakeRow::from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        tracing::debug!(medications = ids.len(), ?range, count = events.len(), "loaded intake events");
        Ok(events)
    }

    fn find_side_effects_by_medication_ids(
        &self,
        ids: &[MedicationId],
    ) -> Result<Vec<SideEffect>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "
            SELECT {SIDE_EFFECT_COLUMNS}
            FROM side_effects
            WHERE medication_id IN ({})
            ORDER BY start_date DESC, id ASC
            ",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(ids.iter().map(MedicationId::as_str)),
            SideEffectRow::from_row,
        )?;
        let mut side_effects = Vec::new();
        for row in rows {
            side_effects.push(row?.into_side_effect()?);
        }
        tracing::debug!(medications = ids.len(), count = side_effects.len(), "loaded side effects");
        Ok(side_effects)
    }

    fn upsert_event(
        &mut self,
        medication_id: &MedicationId,
        date: NaiveDate,
        status: IntakeStatus,
        notes: &str,
    ) -> Result<IntakeEvent, DbError> {
        let now = format_timestamp(Utc::now());
        let row = self.conn.query_row(
            &format!(
                "
                INSERT INTO intake_events (id, medication_id, date, status, notes, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(medication_id, date) DO UPDATE SET
                    status = excluded.status,
                    notes = excluded.notes,
                    updated_at = excluded.updated_at
                RETURNING {INTAKE_COLUMNS}
                "
            ),
            params![
                new_id(),
                medication_id.as_str(),
                format_day(date),
                status.as_str(),
                notes.trim(),
                now,
                now,
            ],
            IntakeRow::from_row,
        )?;
        let event = row.into_event()?;
        tracing::info!(event = %event.id, medication = %medication_id, %date, %status, "logged intake");
        Ok(event)
    }
}

// ========== Row mapping ==========

struct UserRow {
    id: String,
    username: String,
    role: String,
    assigned_clinician_id: Option<String>,
    is_active: bool,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            role: row.get(2)?,
            assigned_clinician_id: row.get(3)?,
            is_active: row.get(4)?,
        })
    }

    fn into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: UserId::new(self.id)?,
            username: self.username,
            role: self.role.parse()?,
            assigned_clinician_id: self.assigned_clinician_id.map(UserId::new).transpose()?,
            is_active: self.is_active,
        })
    }
}

struct MedicationRow {
    id: String,
    owner_id: String,
    name: String,
    dosage: String,
    frequency: String,
    start_date: String,
    end_date: Option<String>,
    instructions: String,
    is_active: bool,
    created_at: String,
}

impl MedicationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            instructions: row.get(7)?,
            is_active: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_medication(self) -> Result<Medication, DbError> {
        let created_at = parse_timestamp(&self.created_at, &self.id)?;
        Ok(Medication {
            id: MedicationId::new(self.id)?,
            owner_id: UserId::new(self.owner_id)?,
            name: self.name,
            dosage: self.dosage,
            frequency: self.frequency,
            start_date: parse_date(&self.start_date, "start_date")?,
            end_date: self
                .end_date
                .as_deref()
                .map(|d| parse_date(d, "end_date"))
                .transpose()?,
            instructions: self.instructions,
            is_active: self.is_active,
            created_at,
        })
    }
}

struct IntakeRow {
    id: String,
    medication_id: String,
    date: String,
    status: String,
    notes: String,
}

impl IntakeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            date: row.get(2)?,
            status: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    fn into_event(self) -> Result<IntakeEvent, DbError> {
        Ok(IntakeEvent {
            id: IntakeEventId::new(self.id)?,
            medication_id: MedicationId::new(self.medication_id)?,
            date: parse_date(&self.date, "date")?,
            status: self.status.parse()?,
            notes: self.notes,
        })
    }
}

struct SideEffectRow {
    id: String,
    medication_id: String,
    effect: String,
    severity: i64,
    start_date: String,
    end_date: Option<String>,
    notes: String,
}

impl SideEffectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            effect: row.get(2)?,
            severity: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    fn into_side_effect(self) -> Result<SideEffect, DbError> {
        Ok(SideEffect {
            id: SideEffectId::new(self.id)?,
            medication_id: MedicationId::new(self.medication_id)?,
            effect: self.effect,
            severity: Severity::new(self.severity)?,
            start_date: parse_date(&self.start_date, "start_date")?,
            end_date: self
                .end_date
                .as_deref()
                .map(|d| parse_date(d, "end_date"))
                .transpose()?,
            notes: self.notes,
        })
    }
}

// ========== Helpers ==========

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn not_found(entity: &'static str, id: &str) -> DbError {
    DbError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn parse_date(value: &str, column: &'static str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DAY_FORMAT).map_err(|source| DbError::InvalidDate {
        column,
        value: value.to_string(),
        source,
    })
}

fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

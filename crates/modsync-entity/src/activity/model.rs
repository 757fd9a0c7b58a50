//! Activity log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable record of a finished job, consumed by external reporting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    /// Store-assigned identifier.
    pub id: i64,
    /// Entity the job acted on.
    pub subject_id: Uuid,
    /// Job that produced the entry.
    pub job_id: i64,
    /// Action kind (e.g. `"mod.update.succeeded"`).
    pub action: String,
    /// Human-readable name of the subject.
    pub name: String,
    /// Version before the action, if any.
    pub from_version: Option<String>,
    /// Version after the action, if any.
    pub to_version: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Data required to append an activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateActivityEntry {
    /// Entity the job acted on.
    pub subject_id: Uuid,
    /// Job that produced the entry.
    pub job_id: i64,
    /// Action kind.
    pub action: String,
    /// Human-readable name of the subject.
    pub name: String,
    /// Version before the action.
    pub from_version: Option<String>,
    /// Version after the action.
    pub to_version: Option<String>,
}

//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use modsync_core::types::JobId;

use super::payload::{JobKind, JobPayload};
use super::status::JobStatus;

/// A background job of one kind, identified by its payload type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "P: JobPayload")]
pub struct Job<P> {
    /// Store-assigned, monotonically increasing identifier.
    pub id: JobId,
    /// Entity the job acts on: an instance for syncs, a mod for updates.
    pub subject_id: Uuid,
    /// Caller-supplied key, unique per subject.
    pub idempotency_key: String,
    /// Current job status.
    pub status: JobStatus,
    /// Kind-specific payload.
    pub payload: P,
    /// Diagnostic text, set only when the job failed.
    pub error: Option<String>,
    /// Worker that holds or held the lease.
    pub worker_id: Option<String>,
    /// When the job was leased.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
}

impl<P: JobPayload> Job<P> {
    /// Whether the job has reached a terminal status and is immutable.
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Whether the job was leased but never finished, e.g. after a crash.
    pub fn is_orphaned(&self) -> bool {
        self.status == JobStatus::Running && self.ended_at.is_none()
    }

    /// Project the fields a poller needs.
    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            id: self.id,
            kind: P::KIND,
            subject_id: self.subject_id,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            error: self.error.clone(),
        }
    }
}

/// Result of an idempotent enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueOutcome {
    /// Id of the new or pre-existing job.
    pub job_id: JobId,
    /// `true` when the key was already used for this subject.
    pub already_existed: bool,
}

/// Status snapshot returned to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusView {
    /// Job identifier.
    pub id: JobId,
    /// Job kind.
    pub kind: JobKind,
    /// Subject the job acts on.
    pub subject_id: Uuid,
    /// Current status.
    pub status: JobStatus,
    /// When the job was leased.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job finished.
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure diagnostic.
    pub error: Option<String>,
}

//! In-memory activity log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use modsync_core::result::AppResult;
use modsync_entity::activity::{ActivityEntry, CreateActivityEntry};

use crate::store::ActivityLog;

/// Append-only in-memory activity log.
#[derive(Debug, Clone, Default)]
pub struct MemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl MemoryActivityLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in append order.
    pub async fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn append(&self, entry: &CreateActivityEntry) -> AppResult<ActivityEntry> {
        let mut entries = self.entries.lock().await;
        let stored = ActivityEntry {
            id: entries.len() as i64 + 1,
            subject_id: entry.subject_id,
            job_id: entry.job_id,
            action: entry.action.clone(),
            name: entry.name.clone(),
            from_version: entry.from_version.clone(),
            to_version: entry.to_version.clone(),
            created_at: Utc::now(),
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_subject(
        &self,
        subject_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ActivityEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

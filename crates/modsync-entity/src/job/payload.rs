//! Typed job payload definitions.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use modsync_core::error::AppError;
use modsync_core::result::AppResult;

/// The two job kinds the engine models. Each kind has its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Reconcile an instance's tracked mods against the catalog.
    Sync,
    /// Move a single mod to a new version.
    Update,
}

impl JobKind {
    /// Table holding jobs of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Sync => "sync_jobs",
            Self::Update => "update_jobs",
        }
    }

    /// Activity action prefix for this kind.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Sync => "catalog.sync",
            Self::Update => "mod.update",
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload carried by a job of a specific kind.
pub trait JobPayload:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// The job kind this payload belongs to.
    const KIND: JobKind;

    /// Reject payloads that can never succeed before they are stored.
    fn validate(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Payload of a catalog sync job. The subject is the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Remote server identity used to filter compatible catalog versions.
    pub server_id: String,
}

impl JobPayload for SyncPayload {
    const KIND: JobKind = JobKind::Sync;

    fn validate(&self) -> AppResult<()> {
        if self.server_id.trim().is_empty() {
            return Err(AppError::validation("server_id must not be empty"));
        }
        Ok(())
    }
}

/// Payload of a mod update job. The subject is the mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Version expected to be installed now; `None` for a fresh install.
    pub from_version: Option<String>,
    /// Version to install.
    pub to_version: String,
}

impl JobPayload for UpdatePayload {
    const KIND: JobKind = JobKind::Update;

    fn validate(&self) -> AppResult<()> {
        if self.to_version.trim().is_empty() {
            return Err(AppError::validation("to_version must not be empty"));
        }
        if self.from_version.as_deref() == Some(self.to_version.as_str()) {
            return Err(AppError::validation(format!(
                "from_version and to_version are both '{}'",
                self.to_version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_rejects_noop() {
        let payload = UpdatePayload {
            from_version: Some("1.2.0".into()),
            to_version: "1.2.0".into(),
        };
        assert!(payload.validate().is_err());

        let install = UpdatePayload {
            from_version: None,
            to_version: "1.2.0".into(),
        };
        assert!(install.validate().is_ok());
    }

    #[test]
    fn test_sync_payload_requires_server() {
        let payload = SyncPayload {
            server_id: "  ".into(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_kind_tables_are_distinct() {
        assert_ne!(JobKind::Sync.table(), JobKind::Update.table());
        assert_eq!(SyncPayload::KIND, JobKind::Sync);
        assert_eq!(UpdatePayload::KIND, JobKind::Update);
    }
}

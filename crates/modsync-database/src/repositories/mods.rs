//! Instance and tracked mod repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use modsync_core::error::{AppError, ErrorKind};
use modsync_core::result::AppResult;
use modsync_core::types::{InstanceId, ModId};
use modsync_entity::catalog::{Instance, TrackedMod};

use crate::store::ModRegistry;

/// Repository for the instance/mod metadata the work functions touch.
#[derive(Debug, Clone)]
pub struct PgModRegistry {
    pool: PgPool,
}

impl PgModRegistry {
    /// Create a new mod registry.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or rename an instance.
    pub async fn upsert_instance(&self, instance: &Instance) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO instances (id, name, server_id) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, server_id = EXCLUDED.server_id",
        )
        .bind(instance.id)
        .bind(&instance.name)
        .bind(&instance.server_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert instance", e))?;
        Ok(())
    }

    /// Start tracking a mod on an instance.
    pub async fn insert_mod(&self, tracked: &TrackedMod) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO mods (id, instance_id, catalog_project_id, name, current_version, available_version) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(tracked.id)
        .bind(tracked.instance_id)
        .bind(&tracked.catalog_project_id)
        .bind(&tracked.name)
        .bind(&tracked.current_version)
        .bind(&tracked.available_version)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert mod", e))?;
        Ok(())
    }
}

#[async_trait]
impl ModRegistry for PgModRegistry {
    async fn list_instances(&self) -> AppResult<Vec<Instance>> {
        sqlx::query_as::<_, Instance>("SELECT id, name, server_id FROM instances ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list instances", e))
    }

    async fn find_instance(&self, id: InstanceId) -> AppResult<Option<Instance>> {
        sqlx::query_as::<_, Instance>("SELECT id, name, server_id FROM instances WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find instance", e))
    }

    async fn find_mod(&self, id: ModId) -> AppResult<Option<TrackedMod>> {
        sqlx::query_as::<_, TrackedMod>("SELECT * FROM mods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find mod", e))
    }

    async fn list_mods(&self, instance_id: InstanceId) -> AppResult<Vec<TrackedMod>> {
        sqlx::query_as::<_, TrackedMod>("SELECT * FROM mods WHERE instance_id = $1 ORDER BY name")
            .bind(instance_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list mods", e))
    }

    async fn set_available_version(&self, id: ModId, version: Option<&str>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE mods SET available_version = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record available version", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Mod {id} not found")));
        }
        Ok(())
    }

    async fn set_current_version(&self, id: ModId, version: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE mods SET current_version = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record installed version", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Mod {id} not found")));
        }
        Ok(())
    }
}

use sqlx::{PgPool, Row};
use uuid::Uuid;

use conflux_data::{DataError, EntityStateRepository, EntityStateRow};

use crate::error::SqlxErrorExt;

/// Postgres-backed [`EntityStateRepository`]. Uses runtime-checked queries
/// (`sqlx::query`/`query_as`, not the `query!` macro family) so the crate
/// builds without a live database at compile time.
#[derive(Clone)]
pub struct PgEntityStateRepository {
    pool: PgPool,
}

impl PgEntityStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_from_record(row: sqlx::postgres::PgRow) -> Result<EntityStateRow, DataError> {
    Ok(EntityStateRow {
        id: row.try_get("id").map_err(SqlxErrorExt::into_data_error)?,
        organization_id: row.try_get("organization_id").map_err(SqlxErrorExt::into_data_error)?,
        sync_id: row.try_get("sync_id").map_err(SqlxErrorExt::into_data_error)?,
        entity_id: row.try_get("entity_id").map_err(SqlxErrorExt::into_data_error)?,
        hash: row.try_get("hash").map_err(SqlxErrorExt::into_data_error)?,
        sync_job_id: row.try_get("sync_job_id").map_err(SqlxErrorExt::into_data_error)?,
        modified_at: row.try_get("modified_at").map_err(SqlxErrorExt::into_data_error)?,
    })
}

#[async_trait::async_trait]
impl EntityStateRepository for PgEntityStateRepository {
    async fn get_by_entity_and_sync(
        &self,
        sync_id: Uuid,
        entity_id: &str,
    ) -> Result<Option<EntityStateRow>, DataError> {
        let row = sqlx::query(
            "SELECT id, organization_id, sync_id, entity_id, hash, sync_job_id, modified_at \
             FROM entity_state WHERE sync_id = $1 AND entity_id = $2",
        )
        .bind(sync_id)
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;

        row.map(row_from_record).transpose()
    }

    async fn create(&self, row: EntityStateRow) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO entity_state (id, organization_id, sync_id, entity_id, hash, sync_job_id, modified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.id)
        .bind(row.organization_id)
        .bind(row.sync_id)
        .bind(row.entity_id)
        .bind(row.hash)
        .bind(row.sync_job_id)
        .bind(row.modified_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    async fn update(&self, row: EntityStateRow) -> Result<(), DataError> {
        let result = sqlx::query(
            "UPDATE entity_state SET hash = $1, sync_job_id = $2, modified_at = $3 \
             WHERE sync_id = $4 AND entity_id = $5",
        )
        .bind(&row.hash)
        .bind(row.sync_job_id)
        .bind(row.modified_at)
        .bind(row.sync_id)
        .bind(&row.entity_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("entity_state {}/{}", row.sync_id, row.entity_id)));
        }
        Ok(())
    }

    async fn bulk_delete_by_sync_job(
        &self,
        sync_id: Uuid,
        keep_entity_ids: &std::collections::HashSet<String>,
    ) -> Result<Vec<EntityStateRow>, DataError> {
        let keep: Vec<String> = keep_entity_ids.iter().cloned().collect();
        let rows = sqlx::query(
            "DELETE FROM entity_state WHERE sync_id = $1 AND NOT (entity_id = ANY($2)) \
             RETURNING id, organization_id, sync_id, entity_id, hash, sync_job_id, modified_at",
        )
        .bind(sync_id)
        .bind(&keep)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        rows.into_iter().map(row_from_record).collect()
    }

    async fn delete(&self, sync_id: Uuid, entity_id: &str) -> Result<bool, DataError> {
        let result = sqlx::query("DELETE FROM entity_state WHERE sync_id = $1 AND entity_id = $2")
            .bind(sync_id)
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }
}

//! The `entity_state` table: the authority on what has been ingested for a
//! given sync. Keyed by `(sync_id, entity_id)`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityStateKey {
    pub sync_id: Uuid,
    pub entity_id: String,
}

#[derive(Debug, Clone)]
pub struct EntityStateRow {
    /// Primary key, also the `db_entity_id` destinations address writes by
    /// (§4.5, §6): stamped on `Insert`, carried forward unchanged on `Update`.
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sync_id: Uuid,
    pub entity_id: String,
    pub hash: String,
    pub sync_job_id: Uuid,
    pub modified_at: DateTime<Utc>,
}

/// Repository over the entity state table. A backend implements this once;
/// the orchestrator never talks SQL directly.
#[async_trait::async_trait]
pub trait EntityStateRepository: Send + Sync {
    async fn get_by_entity_and_sync(
        &self,
        sync_id: Uuid,
        entity_id: &str,
    ) -> Result<Option<EntityStateRow>, DataError>;

    async fn create(&self, row: EntityStateRow) -> Result<(), DataError>;

    async fn update(&self, row: EntityStateRow) -> Result<(), DataError>;

    /// Garbage-collect entities that existed under `sync_id`'s previous run
    /// but were absent from `keep_entity_ids` in this one. Returns the
    /// removed rows (not just a count) so callers can still address the
    /// `db_entity_id` each one occupied in destinations.
    async fn bulk_delete_by_sync_job(
        &self,
        sync_id: Uuid,
        keep_entity_ids: &std::collections::HashSet<String>,
    ) -> Result<Vec<EntityStateRow>, DataError>;

    async fn delete(&self, sync_id: Uuid, entity_id: &str) -> Result<bool, DataError>;
}

/// In-memory reference implementation: used by tests and by embeddable
/// deployments that don't need a durable store across process restarts.
#[derive(Default, Clone)]
pub struct InMemoryEntityStateRepository {
    rows: std::sync::Arc<dashmap::DashMap<EntityStateKey, EntityStateRow>>,
}

impl InMemoryEntityStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EntityStateRepository for InMemoryEntityStateRepository {
    async fn get_by_entity_and_sync(
        &self,
        sync_id: Uuid,
        entity_id: &str,
    ) -> Result<Option<EntityStateRow>, DataError> {
        let key = EntityStateKey { sync_id, entity_id: entity_id.to_string() };
        Ok(self.rows.get(&key).map(|r| r.clone()))
    }

    async fn create(&self, row: EntityStateRow) -> Result<(), DataError> {
        let key = EntityStateKey { sync_id: row.sync_id, entity_id: row.entity_id.clone() };
        self.rows.insert(key, row);
        Ok(())
    }

    async fn update(&self, row: EntityStateRow) -> Result<(), DataError> {
        let key = EntityStateKey { sync_id: row.sync_id, entity_id: row.entity_id.clone() };
        if !self.rows.contains_key(&key) {
            return Err(DataError::NotFound(format!("entity_state {}/{}", row.sync_id, row.entity_id)));
        }
        self.rows.insert(key, row);
        Ok(())
    }

    async fn bulk_delete_by_sync_job(
        &self,
        sync_id: Uuid,
        keep_entity_ids: &std::collections::HashSet<String>,
    ) -> Result<Vec<EntityStateRow>, DataError> {
        let stale: Vec<EntityStateKey> = self
            .rows
            .iter()
            .filter(|entry| entry.key().sync_id == sync_id && !keep_entity_ids.contains(&entry.key().entity_id))
            .map(|entry| entry.key().clone())
            .collect();
        let mut removed = Vec::with_capacity(stale.len());
        for key in &stale {
            if let Some((_, row)) = self.rows.remove(key) {
                removed.push(row);
            }
        }
        Ok(removed)
    }

    async fn delete(&self, sync_id: Uuid, entity_id: &str) -> Result<bool, DataError> {
        let key = EntityStateKey { sync_id, entity_id: entity_id.to_string() };
        Ok(self.rows.remove(&key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sync_id: Uuid, entity_id: &str, hash: &str) -> EntityStateRow {
        EntityStateRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            sync_id,
            entity_id: entity_id.to_string(),
            hash: hash.to_string(),
            sync_job_id: Uuid::nil(),
            modified_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = InMemoryEntityStateRepository::new();
        let sync_id = Uuid::new_v4();
        repo.create(row(sync_id, "e1", "h1")).await.unwrap();
        let got = repo.get_by_entity_and_sync(sync_id, "e1").await.unwrap().unwrap();
        assert_eq!(got.hash, "h1");
    }

    #[tokio::test]
    async fn update_missing_row_errors() {
        let repo = InMemoryEntityStateRepository::new();
        let err = repo.update(row(Uuid::new_v4(), "missing", "h")).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn bulk_delete_keeps_only_listed_ids() {
        let repo = InMemoryEntityStateRepository::new();
        let sync_id = Uuid::new_v4();
        repo.create(row(sync_id, "keep", "h")).await.unwrap();
        repo.create(row(sync_id, "stale", "h")).await.unwrap();
        let keep: std::collections::HashSet<String> = ["keep".to_string()].into_iter().collect();
        let removed = repo.bulk_delete_by_sync_job(sync_id, &keep).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].entity_id, "stale");
        assert!(repo.get_by_entity_and_sync(sync_id, "stale").await.unwrap().is_none());
        assert!(repo.get_by_entity_and_sync(sync_id, "keep").await.unwrap().is_some());
    }
}

//! Secondary cleanup workflow (§4.11, §9.5): tears down everything a sync
//! connection owns when the connection itself is deleted, independent of
//! whether a sync job is currently running. Callable directly — it does not
//! go through [`crate::orchestrator::Orchestrator`].

use std::sync::Arc;

use uuid::Uuid;

use conflux_core::EngineError;
use conflux_data::entity_state::EntityStateRepository;

use crate::destination::Destination;

#[derive(Debug, Default, Clone, Copy)]
pub struct CleanupReport {
    pub destination_rows_removed: u64,
    pub entity_state_rows_removed: u64,
}

/// Issue `bulk_delete_by_parent_id(sync_id)` to every destination this
/// connection wrote to, then remove the connection's `EntityState` rows.
/// Destinations are cleaned up first so a failure there leaves the state
/// store intact for a retry, rather than orphaning destination rows with no
/// record of them left to garbage-collect.
pub async fn cleanup_source_connection(
    sync_id: Uuid,
    destinations: &[Arc<dyn Destination>],
    entity_state: &dyn EntityStateRepository,
) -> Result<CleanupReport, EngineError> {
    let mut report = CleanupReport::default();

    for destination in destinations {
        let removed = destination
            .bulk_delete_by_parent_id(&sync_id.to_string())
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;
        report.destination_rows_removed += removed;
    }

    let empty_keep_set = std::collections::HashSet::new();
    let removed = entity_state
        .bulk_delete_by_sync_job(sync_id, &empty_keep_set)
        .await
        .map_err(|e| EngineError::StateStore(e.to_string()))?;
    report.entity_state_rows_removed = removed.len() as u64;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::{DestinationError, SearchHit};
    use async_trait::async_trait;
    use conflux_core::entity::Entity;
    use conflux_data::entity_state::{EntityStateRow, InMemoryEntityStateRepository};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingDestination {
        deleted: AtomicU64,
    }

    #[async_trait]
    impl Destination for CountingDestination {
        async fn setup_collection(&self, _sync_id: Uuid) -> Result<(), DestinationError> {
            Ok(())
        }
        async fn bulk_insert(&self, _entities: &[(Uuid, &dyn Entity)]) -> Result<(), DestinationError> {
            Ok(())
        }
        async fn delete(&self, _db_entity_id: Uuid) -> Result<(), DestinationError> {
            Ok(())
        }
        async fn bulk_delete_by_parent_id(&self, _parent_id: &str) -> Result<u64, DestinationError> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(5)
        }
        async fn search_for_sync_id(&self, _query: &str, _sync_id: Uuid, _limit: usize) -> Result<Vec<SearchHit>, DestinationError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn removes_rows_from_every_destination_and_the_state_store() {
        let sync_id = Uuid::new_v4();
        let entity_state = InMemoryEntityStateRepository::new();
        entity_state
            .create(EntityStateRow {
                id: Uuid::new_v4(),
                organization_id: Uuid::nil(),
                sync_id,
                entity_id: "e1".into(),
                hash: "h".into(),
                sync_job_id: Uuid::nil(),
                modified_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let destinations: Vec<Arc<dyn Destination>> =
            vec![Arc::new(CountingDestination { deleted: AtomicU64::new(0) }), Arc::new(CountingDestination { deleted: AtomicU64::new(0) })];

        let report = cleanup_source_connection(sync_id, &destinations, &entity_state).await.unwrap();
        assert_eq!(report.destination_rows_removed, 10);
        assert_eq!(report.entity_state_rows_removed, 1);
        assert!(entity_state.get_by_entity_and_sync(sync_id, "e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_destinations_still_clears_entity_state() {
        let sync_id = Uuid::new_v4();
        let entity_state = InMemoryEntityStateRepository::new();
        entity_state
            .create(EntityStateRow {
                id: Uuid::new_v4(),
                organization_id: Uuid::nil(),
                sync_id,
                entity_id: "e1".into(),
                hash: "h".into(),
                sync_job_id: Uuid::nil(),
                modified_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let report = cleanup_source_connection(sync_id, &[], &entity_state).await.unwrap();
        assert_eq!(report.destination_rows_removed, 0);
        assert_eq!(report.entity_state_rows_removed, 1);
    }
}

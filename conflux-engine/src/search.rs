//! Multi-destination search fallback (OPEN QUESTIONS DECISION 1): tries each
//! configured destination in the order it's given — conventionally vector
//! store(s) first, then graph, then hybrid — and returns the first
//! non-empty result set. This is the only search variant conflux builds; a
//! caller that wants a single destination just passes a one-element slice.

use uuid::Uuid;

use crate::destination::{Destination, SearchHit};

/// Search every destination in order until one returns at least one hit.
/// A destination that errors is logged and skipped rather than treated as
/// fatal — search is a best-effort read path, unlike ingestion.
pub async fn search(destinations: &[std::sync::Arc<dyn Destination>], query: &str, sync_id: Uuid, limit: usize) -> Vec<SearchHit> {
    for destination in destinations {
        match destination.search_for_sync_id(query, sync_id, limit).await {
            Ok(hits) if !hits.is_empty() => return hits,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(%err, "destination search failed, falling back to the next destination");
                continue;
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::DestinationError;
    use async_trait::async_trait;
    use conflux_core::entity::Entity;
    use serde_json::json;
    use std::sync::Arc;

    struct EmptyDestination;

    #[async_trait]
    impl Destination for EmptyDestination {
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
            Ok(0)
        }
        async fn search_for_sync_id(&self, _query: &str, _sync_id: Uuid, _limit: usize) -> Result<Vec<SearchHit>, DestinationError> {
            Ok(vec![])
        }
    }

    struct FailingDestination;

    #[async_trait]
    impl Destination for FailingDestination {
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
            Ok(0)
        }
        async fn search_for_sync_id(&self, _query: &str, _sync_id: Uuid, _limit: usize) -> Result<Vec<SearchHit>, DestinationError> {
            Err(DestinationError("unreachable".into()))
        }
    }

    struct HitsDestination;

    #[async_trait]
    impl Destination for HitsDestination {
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
            Ok(0)
        }
        async fn search_for_sync_id(&self, _query: &str, _sync_id: Uuid, _limit: usize) -> Result<Vec<SearchHit>, DestinationError> {
            Ok(vec![SearchHit { db_entity_id: Uuid::nil(), score: 0.9, payload: json!({"ok": true}) }])
        }
    }

    #[tokio::test]
    async fn returns_hits_from_the_first_destination_that_has_any() {
        let destinations: Vec<Arc<dyn Destination>> = vec![Arc::new(EmptyDestination), Arc::new(HitsDestination), Arc::new(EmptyDestination)];
        let hits = search(&destinations, "q", Uuid::new_v4(), 10).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn skips_failing_destinations_and_keeps_trying() {
        let destinations: Vec<Arc<dyn Destination>> = vec![Arc::new(FailingDestination), Arc::new(HitsDestination)];
        let hits = search(&destinations, "q", Uuid::new_v4(), 10).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn all_empty_yields_no_hits() {
        let destinations: Vec<Arc<dyn Destination>> = vec![Arc::new(EmptyDestination), Arc::new(FailingDestination)];
        let hits = search(&destinations, "q", Uuid::new_v4(), 10).await;
        assert!(hits.is_empty());
    }
}

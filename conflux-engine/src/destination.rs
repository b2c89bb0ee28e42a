//! The destination contract (§4.3, §6).

use async_trait::async_trait;
use conflux_core::entity::Entity;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug)]
pub struct DestinationError(pub String);

impl std::fmt::Display for DestinationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "destination error: {}", self.0)
    }
}

impl std::error::Error for DestinationError {}

/// A search hit returned by `search_for_sync_id`, kept destination-agnostic.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub db_entity_id: Uuid,
    pub score: f32,
    pub payload: Value,
}

/// Every destination — vector store, graph store, or hybrid — implements
/// this. `bulk_insert` of a known `db_entity_id` MUST be idempotent: a
/// second insert overwrites rather than duplicating.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn setup_collection(&self, sync_id: Uuid) -> Result<(), DestinationError>;

    async fn bulk_insert(&self, entities: &[(Uuid, &dyn Entity)]) -> Result<(), DestinationError>;

    async fn delete(&self, db_entity_id: Uuid) -> Result<(), DestinationError>;

    async fn bulk_delete_by_parent_id(&self, parent_id: &str) -> Result<u64, DestinationError>;

    async fn search_for_sync_id(&self, query: &str, sync_id: Uuid, limit: usize) -> Result<Vec<SearchHit>, DestinationError>;

    async fn close(&self) -> Result<(), DestinationError> {
        Ok(())
    }

    /// Graph destinations opt in by returning `Some`; vector-only
    /// destinations return `None` and relationship emission skips them.
    fn as_graph(&self) -> Option<&dyn GraphDestination> {
        None
    }
}

/// A single graph edge, properties already flattened to JSON primitives.
#[derive(Debug, Clone)]
pub struct RelationshipWrite {
    pub from_entity_id: Uuid,
    pub to_entity_id: Uuid,
    pub relation_type: &'static str,
    pub properties: Value,
}

#[async_trait]
pub trait GraphDestination: Send + Sync {
    async fn create_node(&self, props: Value, label: &str) -> Result<Uuid, DestinationError>;

    async fn bulk_create_nodes(&self, nodes: &[(Value, &str)]) -> Result<Vec<Uuid>, DestinationError>;

    async fn create_relationship(&self, rel: &RelationshipWrite) -> Result<(), DestinationError>;

    /// Bulk relationship writes fall back to per-edge writes on error
    /// (§4.5) — callers should retry failed entries individually rather
    /// than abort the whole batch.
    async fn bulk_create_relationships(&self, rels: &[RelationshipWrite]) -> Result<(), DestinationError>;
}

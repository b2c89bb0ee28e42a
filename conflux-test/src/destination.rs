//! A recording [`Destination`] fake: every call is appended to an
//! in-memory log so scenario tests can assert exactly what the orchestrator
//! sent, in order, without standing up a real vector or graph store.

use std::sync::Mutex;

use async_trait::async_trait;
use conflux_core::entity::Entity;
use conflux_engine::destination::{Destination, DestinationError, GraphDestination, RelationshipWrite, SearchHit};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Insert(Vec<Uuid>),
    Delete(Uuid),
    DeleteByParent(String),
}

/// Records inserts/deletes; never fails unless told to via
/// [`FakeDestination::failing`]. `as_graph` opts into relationship capture
/// when constructed with [`FakeDestination::graph`].
pub struct FakeDestination {
    calls: Mutex<Vec<RecordedCall>>,
    relationships: Mutex<Vec<RelationshipWrite>>,
    search_hits: Vec<SearchHit>,
    fail: bool,
    is_graph: bool,
}

impl FakeDestination {
    pub fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()), relationships: Mutex::new(Vec::new()), search_hits: Vec::new(), fail: false, is_graph: false }
    }

    pub fn graph() -> Self {
        Self { is_graph: true, ..Self::new() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn with_search_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.search_hits = hits;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn relationships(&self) -> Vec<RelationshipWrite> {
        self.relationships.lock().unwrap().clone()
    }
}

impl Default for FakeDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Destination for FakeDestination {
    async fn setup_collection(&self, _sync_id: Uuid) -> Result<(), DestinationError> {
        Ok(())
    }

    async fn bulk_insert(&self, entities: &[(Uuid, &dyn Entity)]) -> Result<(), DestinationError> {
        if self.fail {
            return Err(DestinationError("fake destination configured to fail".into()));
        }
        let ids = entities.iter().map(|(id, _)| *id).collect();
        self.calls.lock().unwrap().push(RecordedCall::Insert(ids));
        Ok(())
    }

    async fn delete(&self, db_entity_id: Uuid) -> Result<(), DestinationError> {
        if self.fail {
            return Err(DestinationError("fake destination configured to fail".into()));
        }
        self.calls.lock().unwrap().push(RecordedCall::Delete(db_entity_id));
        Ok(())
    }

    async fn bulk_delete_by_parent_id(&self, parent_id: &str) -> Result<u64, DestinationError> {
        if self.fail {
            return Err(DestinationError("fake destination configured to fail".into()));
        }
        self.calls.lock().unwrap().push(RecordedCall::DeleteByParent(parent_id.to_string()));
        Ok(1)
    }

    async fn search_for_sync_id(&self, _query: &str, _sync_id: Uuid, _limit: usize) -> Result<Vec<SearchHit>, DestinationError> {
        Ok(self.search_hits.clone())
    }

    fn as_graph(&self) -> Option<&dyn GraphDestination> {
        if self.is_graph {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl GraphDestination for FakeDestination {
    async fn create_node(&self, _props: serde_json::Value, _label: &str) -> Result<Uuid, DestinationError> {
        Ok(Uuid::new_v4())
    }

    async fn bulk_create_nodes(&self, nodes: &[(serde_json::Value, &str)]) -> Result<Vec<Uuid>, DestinationError> {
        Ok(nodes.iter().map(|_| Uuid::new_v4()).collect())
    }

    async fn create_relationship(&self, rel: &RelationshipWrite) -> Result<(), DestinationError> {
        self.relationships.lock().unwrap().push(rel.clone());
        Ok(())
    }

    async fn bulk_create_relationships(&self, rels: &[RelationshipWrite]) -> Result<(), DestinationError> {
        if self.fail {
            return Err(DestinationError("fake destination configured to fail".into()));
        }
        self.relationships.lock().unwrap().extend(rels.iter().cloned());
        Ok(())
    }
}

//! A scriptable [`Source`] fake: entities and ACL results are supplied up
//! front as a fixed script, not generated dynamically, so scenario tests can
//! assert exact before/after state.

use std::sync::Mutex;

use async_trait::async_trait;
use conflux_core::entity::Entity;
use conflux_engine::source::{AuthMethod, DirSyncResult, EntityStream, RelationDescriptor, Source, SourceDescriptor, SourceError};

/// One scripted batch of entities, delivered in order on `generate_entities`.
/// A source that fails partway through a run is modeled by putting an `Err`
/// in the middle of the script.
pub type ScriptedEntity = Result<Box<dyn Entity>, SourceError>;

pub struct FakeSource {
    short_name: &'static str,
    name: &'static str,
    entities: Mutex<Option<Vec<ScriptedEntity>>>,
    acl_results: Mutex<Vec<DirSyncResult>>,
    relations: &'static [RelationDescriptor],
    validate_result: bool,
}

impl FakeSource {
    pub fn new(short_name: &'static str, name: &'static str, entities: Vec<ScriptedEntity>) -> Self {
        Self {
            short_name,
            name,
            entities: Mutex::new(Some(entities)),
            acl_results: Mutex::new(Vec::new()),
            relations: &[],
            validate_result: true,
        }
    }

    /// Queue `get_acl_changes` results, consumed front-to-back one per call.
    pub fn with_acl_results(self, results: Vec<DirSyncResult>) -> Self {
        *self.acl_results.lock().unwrap() = results;
        self
    }

    pub fn with_relations(mut self, relations: &'static [RelationDescriptor]) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_validate_result(mut self, ok: bool) -> Self {
        self.validate_result = ok;
        self
    }
}

impl SourceDescriptor for FakeSource {
    fn short_name(&self) -> &'static str {
        self.short_name
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn supported_auth_methods(&self) -> &'static [AuthMethod] {
        &[AuthMethod::Direct]
    }

    fn relations(&self) -> &'static [RelationDescriptor] {
        self.relations
    }
}

#[async_trait]
impl Source for FakeSource {
    async fn validate(&self) -> Result<bool, SourceError> {
        Ok(self.validate_result)
    }

    /// Consumes the script on first call — a `FakeSource` models one run,
    /// not a replayable connector.
    fn generate_entities(&self) -> EntityStream<'_> {
        let items = self.entities.lock().unwrap().take().unwrap_or_default();
        Box::pin(tokio_stream::iter(items))
    }

    async fn get_acl_changes(&self, _cursor: Option<&str>) -> Result<DirSyncResult, SourceError> {
        let mut queue = self.acl_results.lock().unwrap();
        if queue.is_empty() {
            Ok(DirSyncResult::default())
        } else {
            Ok(queue.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_core::entity::{ChunkEntity, EntityMeta};

    fn chunk(entity_id: &str) -> ScriptedEntity {
        Ok(Box::new(ChunkEntity {
            meta: EntityMeta {
                source_name: "fake".into(),
                entity_id: entity_id.into(),
                sync_id: uuid::Uuid::nil(),
                sync_job_id: uuid::Uuid::nil(),
                breadcrumbs: vec![],
                parent_id: None,
                sync_metadata: serde_json::json!({}),
            },
            text: "hello".into(),
            properties: serde_json::json!({}),
        }))
    }

    #[tokio::test]
    async fn replays_the_scripted_entities_in_order() {
        use futures_util::StreamExt;
        let source = FakeSource::new("fake", "Fake", vec![chunk("a"), chunk("b")]);
        let mut stream = source.generate_entities();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.meta().entity_id, "a");
        assert_eq!(second.meta().entity_id, "b");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn acl_results_are_consumed_front_to_back() {
        let source = FakeSource::new("fake", "Fake", vec![]).with_acl_results(vec![
            DirSyncResult { incremental_values: true, cookie_b64: "first".into(), ..Default::default() },
            DirSyncResult { incremental_values: false, cookie_b64: "second".into(), ..Default::default() },
        ]);
        let first = source.get_acl_changes(None).await.unwrap();
        let second = source.get_acl_changes(Some("first")).await.unwrap();
        let third = source.get_acl_changes(Some("second")).await.unwrap();
        assert_eq!(first.cookie_b64, "first");
        assert_eq!(second.cookie_b64, "second");
        assert_eq!(third.cookie_b64, "");
    }
}

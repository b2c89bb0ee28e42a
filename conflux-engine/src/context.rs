//! Per-job composition root (§2, REDESIGN FLAGS: "Singleton services →
//! explicit construction in `SyncContext`, composed per job"). Everything an
//! [`crate::orchestrator::Orchestrator`] or [`crate::acl::AclPipeline`] needs
//! for one run is gathered here once, by whatever glue code (scheduler, CLI)
//! is starting the job — nothing in this struct is process-global.

use std::collections::HashMap;
use std::sync::Arc;

use conflux_data::entity_state::EntityStateRepository;
use conflux_data::membership::MembershipRepository;
use conflux_events::progress::ProgressRegistry;

use crate::acl::AclPipeline;
use crate::cursor::SyncCursor;
use crate::dag::{DagRouter, NodeId, Transformer};
use crate::destination::Destination;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::source::Source;

/// One sync job's fully-wired dependency set. Built fresh per run; never
/// reused across jobs.
pub struct SyncContext {
    pub source: Arc<dyn Source>,
    pub destinations: Vec<Arc<dyn Destination>>,
    pub router: Arc<DagRouter>,
    pub transformers: HashMap<NodeId, Arc<dyn Transformer>>,
    pub entity_state: Arc<dyn EntityStateRepository>,
    pub membership: Arc<dyn MembershipRepository>,
    pub progress: ProgressRegistry,
    pub cursor: SyncCursor,
}

impl SyncContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn Source>,
        destinations: Vec<Arc<dyn Destination>>,
        router: Arc<DagRouter>,
        transformers: HashMap<NodeId, Arc<dyn Transformer>>,
        entity_state: Arc<dyn EntityStateRepository>,
        membership: Arc<dyn MembershipRepository>,
        progress: ProgressRegistry,
        cursor: SyncCursor,
    ) -> Self {
        Self { source, destinations, router, transformers, entity_state, membership, progress, cursor }
    }

    /// Build the orchestrator for this run. Consumes none of the context —
    /// the ACL pipeline runs independently against the same `source` and
    /// `membership` store (§5: "ACL pipeline and entity pipeline are
    /// independent").
    pub fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::new(
            config,
            self.source.clone(),
            self.destinations.clone(),
            self.router.clone(),
            self.transformers.clone(),
            self.entity_state.clone(),
            self.progress.clone(),
        )
    }

    pub fn acl_pipeline(&self) -> AclPipeline {
        AclPipeline::new(self.membership.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Dag, DagEdge, DagNode, NodeKind};
    use crate::destination::{DestinationError, SearchHit};
    use crate::source::{AuthMethod, SourceDescriptor, SourceError};
    use async_trait::async_trait;
    use conflux_core::entity::Entity;
    use conflux_data::entity_state::InMemoryEntityStateRepository;
    use conflux_data::membership::InMemoryMembershipRepository;
    use uuid::Uuid;

    struct StubSource;

    impl SourceDescriptor for StubSource {
        fn short_name(&self) -> &'static str {
            "stub"
        }
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn supported_auth_methods(&self) -> &'static [AuthMethod] {
            &[AuthMethod::Direct]
        }
    }

    #[async_trait]
    impl Source for StubSource {
        async fn validate(&self) -> Result<bool, SourceError> {
            Ok(true)
        }
        fn generate_entities(&self) -> crate::source::EntityStream<'_> {
            Box::pin(tokio_stream::iter(Vec::<Result<Box<dyn Entity>, SourceError>>::new()))
        }
    }

    struct NoopDestination;

    #[async_trait]
    impl Destination for NoopDestination {
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

    fn sample_dag() -> Arc<DagRouter> {
        let dag = Dag::new(
            vec![
                DagNode { id: "stub".into(), kind: NodeKind::Source, accepts: None },
                DagNode { id: "dest".into(), kind: NodeKind::Destination, accepts: None },
            ],
            vec![DagEdge { from: "stub".into(), to: "dest".into() }],
        )
        .unwrap();
        Arc::new(DagRouter::new(dag))
    }

    fn build_context() -> SyncContext {
        SyncContext::new(
            Arc::new(StubSource),
            vec![Arc::new(NoopDestination)],
            sample_dag(),
            HashMap::new(),
            Arc::new(InMemoryEntityStateRepository::new()),
            Arc::new(InMemoryMembershipRepository::new()),
            ProgressRegistry::new(),
            SyncCursor::default(),
        )
    }

    #[tokio::test]
    async fn orchestrator_built_from_context_runs_to_completion() {
        let ctx = build_context();
        let config = OrchestratorConfig::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let report = ctx.orchestrator(config).run(tokio_util::sync::CancellationToken::new()).await.unwrap();
        assert_eq!(report.inserted, 0);
    }

    #[tokio::test]
    async fn acl_pipeline_built_from_context_runs_against_an_empty_source() {
        let ctx = build_context();
        let report = ctx
            .acl_pipeline()
            .run(ctx.source.as_ref(), Uuid::new_v4(), Uuid::new_v4(), "stub", None)
            .await
            .unwrap();
        assert_eq!(report.0.upserted, 0);
    }
}

//! Cross-component scenarios seeded against the in-memory fakes (teacher
//! style: end-to-end `#[tokio::test]`s living in a crate's `tests/`
//! directory, e.g. `r2e-oidc/tests/integration.rs`).

use std::collections::HashMap;
use std::sync::Arc;

use conflux_core::entity::{ChunkEntity, EntityMeta};
use conflux_data::entity_state::InMemoryEntityStateRepository;
use conflux_data::membership::{InMemoryMembershipRepository, MemberType};
use conflux_engine::dag::{Dag, DagEdge, DagNode, NodeKind};
use conflux_engine::destination::Destination;
use conflux_engine::orchestrator::OrchestratorConfig;
use conflux_engine::source::{DirSyncChange, DirSyncChangeType, DirSyncResult, Source};
use conflux_engine::{AclPipeline, DagRouter, Orchestrator};
use conflux_test::{FakeDestination, FakeSource};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn meta(entity_id: &str) -> EntityMeta {
    EntityMeta {
        source_name: "test_source".into(),
        entity_id: entity_id.into(),
        sync_id: Uuid::nil(),
        sync_job_id: Uuid::nil(),
        breadcrumbs: vec![],
        parent_id: None,
        sync_metadata: serde_json::json!({}),
    }
}

fn chunk(entity_id: &str, text: &str) -> Box<dyn conflux_core::entity::Entity> {
    Box::new(ChunkEntity { meta: meta(entity_id), text: text.into(), properties: serde_json::json!({}) })
}

fn direct_dag() -> Arc<DagRouter> {
    let dag = Dag::new(
        vec![
            DagNode { id: "test_source".into(), kind: NodeKind::Source, accepts: None },
            DagNode { id: "dest".into(), kind: NodeKind::Destination, accepts: None },
        ],
        vec![DagEdge { from: "test_source".into(), to: "dest".into() }],
    )
    .unwrap();
    Arc::new(DagRouter::new(dag))
}

/// S1 — First sync, 3 entities: every entity is new, all three are inserted.
#[tokio::test]
async fn s1_first_sync_three_entities() {
    let sync_id = Uuid::new_v4();
    let entity_state = Arc::new(InMemoryEntityStateRepository::new());
    let destination = Arc::new(FakeDestination::new());
    let source = FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1")), Ok(chunk("b", "2")), Ok(chunk("c", "3"))]);

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(Uuid::new_v4(), sync_id, Uuid::new_v4()),
        Arc::new(source) as Arc<dyn Source>,
        vec![destination.clone() as Arc<dyn Destination>],
        direct_dag(),
        HashMap::new(),
        entity_state,
        conflux_events::progress::ProgressRegistry::new(),
    );

    let report = orchestrator.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(report.updated, 0);
    assert_eq!(report.already_sync, 0);
}

/// S2 — Re-sync unchanged: a second run over identical content counts every
/// entity as `already_sync`, with no further destination writes.
#[tokio::test]
async fn s2_resync_unchanged() {
    let sync_id = Uuid::new_v4();
    let entity_state = Arc::new(InMemoryEntityStateRepository::new());
    let destination = Arc::new(FakeDestination::new());

    let run = |source: FakeSource, job_id: Uuid| {
        Orchestrator::new(
            OrchestratorConfig::new(Uuid::new_v4(), sync_id, job_id),
            Arc::new(source) as Arc<dyn Source>,
            vec![destination.clone() as Arc<dyn Destination>],
            direct_dag(),
            HashMap::new(),
            entity_state.clone(),
            conflux_events::progress::ProgressRegistry::new(),
        )
    };

    run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1"))]), Uuid::new_v4())
        .run(CancellationToken::new())
        .await
        .unwrap();

    let report = run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1"))]), Uuid::new_v4())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.already_sync, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(destination.calls().iter().filter(|c| matches!(c, conflux_test::RecordedCall::Insert(_))).count(), 1);
}

/// S3 — Partial update: one entity's content changes between runs; only that
/// entity is counted `updated`, and the destination sees a delete-then-insert.
#[tokio::test]
async fn s3_partial_update() {
    let sync_id = Uuid::new_v4();
    let entity_state = Arc::new(InMemoryEntityStateRepository::new());
    let destination = Arc::new(FakeDestination::new());

    let run = |source: FakeSource| {
        Orchestrator::new(
            OrchestratorConfig::new(Uuid::new_v4(), sync_id, Uuid::new_v4()),
            Arc::new(source) as Arc<dyn Source>,
            vec![destination.clone() as Arc<dyn Destination>],
            direct_dag(),
            HashMap::new(),
            entity_state.clone(),
            conflux_events::progress::ProgressRegistry::new(),
        )
    };

    run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1")), Ok(chunk("b", "1"))]))
        .run(CancellationToken::new())
        .await
        .unwrap();

    let report = run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "2")), Ok(chunk("b", "1"))]))
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.already_sync, 1);
    assert_eq!(report.inserted, 0);
    let deletes = destination.calls().iter().filter(|c| matches!(c, conflux_test::RecordedCall::Delete(_))).count();
    assert_eq!(deletes, 1);
}

/// S4 — Removal: an entity absent from a later run is removed from the
/// state store and every destination via end-of-run garbage collection.
#[tokio::test]
async fn s4_removal() {
    let sync_id = Uuid::new_v4();
    let entity_state = Arc::new(InMemoryEntityStateRepository::new());
    let destination = Arc::new(FakeDestination::new());

    let run = |source: FakeSource| {
        Orchestrator::new(
            OrchestratorConfig::new(Uuid::new_v4(), sync_id, Uuid::new_v4()),
            Arc::new(source) as Arc<dyn Source>,
            vec![destination.clone() as Arc<dyn Destination>],
            direct_dag(),
            HashMap::new(),
            entity_state.clone(),
            conflux_events::progress::ProgressRegistry::new(),
        )
    };

    run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1")), Ok(chunk("b", "1"))]))
        .run(CancellationToken::new())
        .await
        .unwrap();

    let report = run(FakeSource::new("test_source", "Test", vec![Ok(chunk("a", "1"))])).run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.removed, 1);
    assert!(entity_state.get_by_entity_and_sync(sync_id, "b").await.unwrap().is_none());
    let deletes = destination.calls().iter().filter(|c| matches!(c, conflux_test::RecordedCall::Delete(_))).count();
    assert_eq!(deletes, 1);
}

fn add(group: &str, member: &str) -> DirSyncChange {
    DirSyncChange { change_type: DirSyncChangeType::Add, member_id: member.into(), member_type: MemberType::User, group_id: group.into(), group_name: Some(group.into()) }
}

/// S5 — ACL reconciliation under BASIC: a directory that only ever reports
/// full membership lists (all-ADDs) drives reconciliation, pruning members
/// the latest listing no longer mentions.
#[tokio::test]
async fn s5_acl_reconciliation_under_basic() {
    let membership = Arc::new(InMemoryMembershipRepository::new());
    let pipeline = AclPipeline::new(membership.clone());
    let org = Uuid::new_v4();
    let conn = Uuid::new_v4();

    let source = FakeSource::new("dir", "Directory", vec![]).with_acl_results(vec![
        DirSyncResult { changes: vec![add("g1", "alice"), add("g1", "bob")], incremental_values: false, modified_group_ids: ["g1".to_string()].into_iter().collect(), ..Default::default() },
        DirSyncResult { changes: vec![add("g1", "alice")], incremental_values: false, modified_group_ids: ["g1".to_string()].into_iter().collect(), ..Default::default() },
    ]);

    let (_, cursor) = pipeline.run(&source, org, conn, "dir", None).await.unwrap();
    let (report, _) = pipeline.run(&source, org, conn, "dir", Some(&cursor)).await.unwrap();

    assert_eq!(report.reconciled, 1);
    let remaining = membership.list_by_group(org, conn, "g1").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key.member_id, "alice");
}

/// S6 — Deleted group: the directory reports a group as deleted; every
/// membership row under it is removed regardless of dirsync mode.
#[tokio::test]
async fn s6_deleted_group() {
    let membership = Arc::new(InMemoryMembershipRepository::new());
    let pipeline = AclPipeline::new(membership.clone());
    let org = Uuid::new_v4();
    let conn = Uuid::new_v4();

    let source = FakeSource::new("dir", "Directory", vec![]).with_acl_results(vec![
        DirSyncResult { changes: vec![add("g1", "alice"), add("g1", "bob")], incremental_values: true, ..Default::default() },
        DirSyncResult { deleted_group_ids: ["g1".to_string()].into_iter().collect(), incremental_values: true, ..Default::default() },
    ]);

    pipeline.run(&source, org, conn, "dir", None).await.unwrap();
    let (report, _) = pipeline.run(&source, org, conn, "dir", None).await.unwrap();

    assert_eq!(report.groups_deleted, 2);
    assert!(membership.list_by_group(org, conn, "g1").await.unwrap().is_empty());
}

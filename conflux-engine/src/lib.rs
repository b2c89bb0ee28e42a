//! The sync engine: source/destination contracts, the DAG router, the
//! per-job orchestrator, the ACL pipeline, and the connector registry.
//!
//! Composition root for one job is [`context::SyncContext`]; the only
//! process-global state outside it is [`conflux_events::progress::ProgressRegistry`]
//! and [`registry::ConnectorRegistry`] (REDESIGN FLAGS).

pub mod acl;
pub mod cleanup;
pub mod context;
pub mod cursor;
pub mod dag;
pub mod destination;
pub mod fields;
pub mod orchestrator;
pub mod registry;
pub mod search;
pub mod source;
pub mod stream;

pub use acl::{AclPipeline, AclPipelineReport};
pub use context::SyncContext;
pub use cursor::SyncCursor;
pub use dag::{Dag, DagEdge, DagError, DagNode, DagRouter, NodeId, NodeKind, Transformer};
pub use destination::{Destination, DestinationError, GraphDestination, RelationshipWrite, SearchHit};
pub use fields::{FieldValue, Fields};
pub use orchestrator::{Orchestrator, OrchestratorConfig, SyncReport};
pub use registry::{ConnectorRegistry, DestinationRegistryEntry, SourceRegistryEntry};
pub use source::{AuthMethod, DirSyncChange, DirSyncChangeType, DirSyncResult, RelationDescriptor, Source, SourceDescriptor, SourceError};
pub use stream::AsyncSourceStream;

pub mod prelude {
    pub use crate::context::SyncContext;
    pub use crate::dag::{Dag, DagEdge, DagNode, DagRouter, NodeKind, Transformer};
    pub use crate::destination::{Destination, GraphDestination};
    pub use crate::orchestrator::{Orchestrator, OrchestratorConfig, SyncReport};
    pub use crate::registry::ConnectorRegistry;
    pub use crate::source::{Source, SourceDescriptor};
}

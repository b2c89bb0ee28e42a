//! The source contract (§4.2, §6): everything a connector must implement to
//! feed entities and ACL changes into a sync job.

use async_trait::async_trait;
use conflux_core::entity::Entity;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::pin::Pin;

/// A boxed, send-able stream of entities — the producer side of the
/// bounded buffer in [`crate::stream::AsyncSourceStream`] (§4.4).
pub type EntityStream<'a> = Pin<Box<dyn Stream<Item = Result<Box<dyn Entity>, SourceError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    Direct,
    OauthToken,
    OauthBrowser,
    OauthByoc,
    AuthProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSyncChangeType {
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct DirSyncChange {
    pub change_type: DirSyncChangeType,
    pub member_id: String,
    pub member_type: conflux_data::membership::MemberType,
    pub group_id: String,
    pub group_name: Option<String>,
}

/// Result of one `get_acl_changes` call (§6). `cookie_b64` round-trips
/// through the cursor so the next call resumes where this one left off.
#[derive(Debug, Clone, Default)]
pub struct DirSyncResult {
    pub changes: Vec<DirSyncChange>,
    pub modified_group_ids: HashSet<String>,
    pub deleted_group_ids: HashSet<String>,
    /// `false` means the directory only ever returns full membership lists
    /// as all-`Add`s (BASIC dirsync) and reconciliation must run.
    pub incremental_values: bool,
    pub cookie_b64: String,
}

/// A fatal error raised from a source — aborts the whole job, unlike a
/// per-entity failure which the orchestrator swallows and counts.
#[derive(Debug)]
pub struct SourceError(pub String);

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source error: {}", self.0)
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for conflux_core::EngineError {
    fn from(err: SourceError) -> Self {
        conflux_core::EngineError::Other(err.0)
    }
}

/// Relationship descriptor declared by a source module for graph
/// destinations (§4.5, §6). `source_id_field` / `target_id_field` name
/// fields read through a type's [`crate::fields::Fields`] accessor, never
/// via string-keyed runtime reflection.
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub source_type: &'static str,
    pub source_id_field: &'static str,
    pub target_type: &'static str,
    pub target_id_field: &'static str,
    pub relation_type: &'static str,
}

/// Per-connector capability flags and identity (§4.2, §6).
pub trait SourceDescriptor {
    fn short_name(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn supports_continuous(&self) -> bool {
        false
    }
    fn requires_byoc(&self) -> bool {
        false
    }
    fn federated_search(&self) -> bool {
        false
    }
    fn supported_auth_methods(&self) -> &'static [AuthMethod];
    /// Static relationship table for graph destinations; empty if this
    /// source never emits graph edges.
    fn relations(&self) -> &'static [RelationDescriptor] {
        &[]
    }
}

/// What a source implements to participate in a sync job.
#[async_trait]
pub trait Source: SourceDescriptor + Send + Sync {
    /// Cheap connectivity check. Never destructive.
    async fn validate(&self) -> Result<bool, SourceError>;

    /// Lazily stream entities. May be unbounded — callers must cancel.
    /// Errors propagate to every consumer after in-flight items drain
    /// (§4.4); they are fatal to the job.
    fn generate_entities(&self) -> EntityStream<'_>;

    /// Diff directory memberships since `cursor` (opaque, source-defined).
    /// Sources that don't support ACLs simply never get this called by the
    /// scheduler glue (no flag needed beyond absence of use).
    async fn get_acl_changes(&self, _cursor: Option<&str>) -> Result<DirSyncResult, SourceError> {
        Ok(DirSyncResult::default())
    }
}

//! The entity model: the unit of sync.
//!
//! Every record that flows through the pipeline implements [`Entity`]. The
//! trait is deliberately small — identity, breadcrumbs, and a deterministic
//! content hash are the only things the orchestrator needs; everything else
//! is the payload type's own business.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// The value of one declared relationship field (§4.5): either a single
/// foreign id or a list of them (an entity may reference many parents of the
/// same kind).
#[derive(Debug, Clone)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    pub fn into_ids(self) -> Vec<String> {
        match self {
            FieldValue::One(id) => vec![id],
            FieldValue::Many(ids) => ids,
        }
    }
}

/// Compile-time field access for relationship emission (REDESIGN FLAGS):
/// a source declares a relationship by field *name*, but the lookup is
/// resolved through a `match` the compiler checks against an entity type's
/// real fields — never a dynamic `getattr`-style reflection over an untyped
/// map. Lives alongside [`Entity`] (rather than in the engine crate) so
/// [`Entity::as_fields`] can return it without a dependency cycle.
pub trait Fields {
    fn field(&self, name: &str) -> Option<FieldValue>;
    fn field_names(&self) -> &'static [&'static str];
}

/// One step of an entity's ancestry, as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Breadcrumb {
    pub entity_id: String,
    pub name: String,
}

/// Whether a [`DeletionEntity`] represents a hard removal or an archival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum DeletionStatus {
    Removed,
    Archived,
}

/// Identity fields shared by every entity, independent of payload shape.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct EntityMeta {
    pub source_name: String,
    pub entity_id: String,
    pub sync_id: uuid::Uuid,
    pub sync_job_id: uuid::Uuid,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub parent_id: Option<String>,
    /// Arbitrary source-supplied metadata, serialized for logging and for
    /// destinations that want to carry it through untouched.
    pub sync_metadata: serde_json::Value,
}

/// The unit of sync: identity plus a content hash the orchestrator can
/// compare against the entity state store without re-reading the payload.
///
/// `content_hash` MUST be pure and MUST ignore volatile fields (timestamps,
/// server-assigned ids) — two calls on logically-equal payloads produced at
/// different times must agree.
pub trait Entity: Send + Sync {
    fn meta(&self) -> &EntityMeta;

    /// Stable identifier for this entity's concrete payload type, used by
    /// the DAG router to match transformer input types. Defaults to the
    /// implementing type's path; a wrapper type (e.g. one that enriches
    /// another entity) must override this to delegate to the type it wraps.
    fn entity_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Typed field access for relationship emission (§4.5). `None` for
    /// entity types that never participate in a declared relationship table.
    fn as_fields(&self) -> Option<&dyn Fields> {
        None
    }

    /// Canonical, timestamp-free content hash, hex-encoded SHA-256 of a
    /// sorted-key JSON serialization of [`Entity::hashable_payload`].
    fn content_hash(&self) -> String {
        let value = self.hashable_payload();
        let canonical = canonicalize(&value);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// The subset of the payload that participates in [`Entity::content_hash`].
    /// Implementors exclude server timestamps and anything re-assigned on
    /// every fetch.
    fn hashable_payload(&self) -> serde_json::Value;
}

/// Recursively sort object keys so serialization order never perturbs the hash.
fn canonicalize(value: &serde_json::Value) -> String {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut sorted = serde_json::Map::new();
                for (k, v) in entries {
                    sorted.insert(k.clone(), sort(v));
                }
                serde_json::Value::Object(sorted)
            }
            serde_json::Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(sort).collect())
            }
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

/// Text/binary payload destined for a vector or graph store.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ChunkEntity {
    pub meta: EntityMeta,
    pub text: String,
    /// Scalar/array-of-scalar properties only; complex values must already
    /// be JSON-encoded strings by the time they reach a graph destination.
    pub properties: serde_json::Value,
}

impl Entity for ChunkEntity {
    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn hashable_payload(&self) -> serde_json::Value {
        serde_json::json!({ "text": self.text, "properties": self.properties })
    }
}

/// A file-backed entity: has a local handle and a MIME type in addition to
/// the chunk payload.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct FileEntity {
    pub meta: EntityMeta,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Content hash of the file bytes themselves, computed by the source —
    /// cheaper than re-reading the file on every run.
    pub file_hash: String,
}

impl Entity for FileEntity {
    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn hashable_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "file_name": self.file_name,
            "mime_type": self.mime_type,
            "file_hash": self.file_hash,
        })
    }
}

/// Signals that an entity observed in a previous run is gone.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct DeletionEntity {
    pub meta: EntityMeta,
    pub deletion_status: DeletionStatus,
}

impl DeletionEntity {
    /// Construct a deletion entity, enforcing that breadcrumbs and
    /// `deletion_status` are always present — a deletion with no identity
    /// trail can't be routed to the right destinations.
    pub fn new(meta: EntityMeta, deletion_status: DeletionStatus) -> Result<Self, EntityBuildError> {
        if meta.breadcrumbs.is_empty() {
            return Err(EntityBuildError::MissingBreadcrumbs);
        }
        Ok(Self { meta, deletion_status })
    }
}

impl Entity for DeletionEntity {
    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn hashable_payload(&self) -> serde_json::Value {
        serde_json::json!({ "deletion_status": matches!(self.deletion_status, DeletionStatus::Removed) })
    }
}

#[derive(Debug)]
pub enum EntityBuildError {
    MissingBreadcrumbs,
}

impl std::fmt::Display for EntityBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityBuildError::MissingBreadcrumbs => {
                write!(f, "deletion entity requires at least one breadcrumb")
            }
        }
    }
}

impl std::error::Error for EntityBuildError {}

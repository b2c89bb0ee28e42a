//! Core types shared across the sync engine: the entity model, the error
//! taxonomy, layered configuration, and logging init.

pub mod config;
pub mod entity;
pub mod error;
pub mod logging;

pub use config::EngineConfig;
pub use entity::{
    Breadcrumb, ChunkEntity, DeletionEntity, DeletionStatus, Entity, EntityBuildError, EntityMeta,
    FieldValue, Fields, FileEntity,
};
pub use error::{EngineError, EntityError};

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::entity::{Entity, EntityMeta, FieldValue, Fields};
    pub use crate::error::{EngineError, EntityError};
}

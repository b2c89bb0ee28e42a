//! Backend-agnostic data access for Conflux's two durable tables: the
//! entity state store and the access-control membership table. This crate
//! carries zero database-driver dependencies; concrete backends live in
//! `conflux-data-sqlx`.

pub mod entity_state;
pub mod error;
pub mod membership;

pub use entity_state::{EntityStateKey, EntityStateRepository, EntityStateRow, InMemoryEntityStateRepository};
pub use error::DataError;
pub use membership::{
    InMemoryMembershipRepository, MemberType, MembershipKey, MembershipRepository, MembershipRow,
};

pub mod prelude {
    pub use crate::{
        DataError, EntityStateKey, EntityStateRepository, EntityStateRow, MemberType, MembershipKey,
        MembershipRepository, MembershipRow,
    };
}

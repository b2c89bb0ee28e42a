//! Postgres backend for Conflux's data layer. Depends on `conflux-data` for
//! the abstract repository traits and adds the concrete `sqlx`-backed
//! implementations plus error bridging.

pub mod entity_state;
pub mod error;
pub mod membership;
pub mod migration;

pub use entity_state::PgEntityStateRepository;
pub use error::{SqlxErrorExt, SqlxResult};
pub use membership::PgMembershipRepository;

pub mod prelude {
    pub use crate::{PgEntityStateRepository, PgMembershipRepository, SqlxErrorExt};
    pub use conflux_data::prelude::*;
}

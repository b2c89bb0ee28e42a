//! In-memory fakes for conflux's connector contracts (§9.4). Depended on
//! only via `[dev-dependencies]` — never a production dependency of any
//! other crate in this workspace.

pub mod destination;
pub mod source;

pub use destination::{FakeDestination, RecordedCall};
pub use source::{FakeSource, ScriptedEntity};

pub use conflux_data::entity_state::InMemoryEntityStateRepository;
pub use conflux_data::membership::InMemoryMembershipRepository;

//! Conflux — a sync engine that pulls entities from external sources,
//! routes them through a transformer DAG, and writes them to one or more
//! destinations, with ACL reconciliation and end-of-run garbage collection
//! running alongside.
//!
//! This facade crate re-exports all Conflux sub-crates behind a single
//! dependency with feature flags. Pull in everything with:
//!
//! ```ignore
//! use conflux::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature      | Default | Crate                  |
//! |--------------|---------|------------------------|
//! | `engine`     | **yes** | `conflux-engine`       |
//! | `events`     | **yes** | `conflux-events`       |
//! | `executor`   | **yes** | `conflux-executor`     |
//! | `data`       | no      | `conflux-data`         |
//! | `data-sqlx`  | no      | `conflux-data-sqlx`    |
//! | `cache`      | no      | `conflux-cache`        |
//! | `rate-limit` | no      | `conflux-rate-limit`   |
//! | `scheduler`  | no      | `conflux-scheduler`    |
//! | `token`      | no      | `conflux-token`        |
//! | `full`       | no      | All of the above       |

pub use conflux_core::*;

#[cfg(feature = "engine")]
pub use conflux_engine;

#[cfg(feature = "events")]
pub use conflux_events;

#[cfg(feature = "executor")]
pub use conflux_executor;

#[cfg(feature = "data")]
pub use conflux_data;

#[cfg(feature = "data-sqlx")]
pub use conflux_data_sqlx;

#[cfg(feature = "cache")]
pub use conflux_cache;

#[cfg(feature = "rate-limit")]
pub use conflux_rate_limit;

#[cfg(feature = "scheduler")]
pub use conflux_scheduler;

#[cfg(feature = "token")]
pub use conflux_token;

/// Unified prelude — `use conflux::prelude::*`.
pub mod prelude {
    pub use conflux_core::prelude::*;

    #[cfg(feature = "engine")]
    pub use conflux_engine::prelude::*;
}

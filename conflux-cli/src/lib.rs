//! Library surface behind the `conflux` binary, split out so a wrapper
//! binary embedding its own connectors can reuse the command implementations
//! (see [`connectors::build_registry`]).

pub mod commands;
pub mod connectors;
pub mod exit_code;
pub mod job_store;

//! Builds the process-wide [`ConnectorRegistry`] the `sync run` command
//! looks `--source`/`--destination` short names up in.
//!
//! This crate ships the engine and its CLI, not connector implementations —
//! the registry starts empty. A deployment that embeds `conflux-cli` (or a
//! wrapper binary built on top of it) registers its own source and
//! destination crates here before calling [`crate::commands::run::execute`],
//! the same way `r2e add <extension>` only wires an extension into a
//! project's own `Cargo.toml` rather than bundling every extension by
//! default.

use conflux_engine::ConnectorRegistry;

pub fn build_registry() -> ConnectorRegistry {
    ConnectorRegistry::new()
}

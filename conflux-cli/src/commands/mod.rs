//! Command implementations for the `conflux` CLI.
//!
//! Each submodule corresponds to one `sync` subcommand.

/// `conflux sync cancel` — request cancellation of a running job.
pub mod cancel;

/// `conflux sync run` — run a sync job to completion.
pub mod run;

/// `conflux sync status` — report a job's last known status.
pub mod status;

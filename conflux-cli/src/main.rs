use clap::{Parser, Subcommand};
use uuid::Uuid;

use conflux_cli::commands::{cancel, run, status};
use conflux_cli::exit_code;

#[derive(Parser)]
#[command(name = "conflux", version, about = "Conflux sync engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run, cancel, or inspect sync jobs
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Run a sync job to completion
    Run {
        /// Sync connection id this job runs under
        #[arg(long)]
        sync_id: Uuid,
        /// Owning organization id
        #[arg(long)]
        org_id: Uuid,
        /// Registered source connector short_name
        #[arg(long)]
        source: String,
        /// Source connector config, as a JSON object
        #[arg(long, default_value = "{}")]
        source_config: String,
        /// Registered destination connector short_name; repeat to fan out
        #[arg(long = "destination", num_args = 1..)]
        destinations: Vec<String>,
        /// Destination connector configs, JSON objects, one per --destination
        /// in the same order (omitted ones default to `{}`)
        #[arg(long = "destination-config", num_args = 0..)]
        destination_configs: Vec<String>,
        /// Config profile (`conflux-<profile>.yaml`, `.env.<profile>`)
        #[arg(long, default_value = "production")]
        profile: String,
        /// Override the configured worker pool width
        #[arg(long)]
        max_workers: Option<usize>,
        /// Wall-clock deadline for the whole job
        #[arg(long, default_value_t = 3600)]
        timeout_secs: u64,
    },
    /// Request cancellation of a running job
    Cancel {
        #[arg(long)]
        job_id: Uuid,
    },
    /// Report a job's last known status
    Status {
        #[arg(long)]
        job_id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    conflux_core::logging::init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Sync { action } => match action {
            SyncAction::Run {
                sync_id,
                org_id,
                source,
                source_config,
                destinations,
                destination_configs,
                profile,
                max_workers,
                timeout_secs,
            } => {
                let parsed = parse_run_args(
                    org_id,
                    sync_id,
                    source,
                    source_config,
                    destinations,
                    destination_configs,
                    profile,
                    max_workers,
                    timeout_secs,
                );
                match parsed {
                    Ok(args) => run::execute(args).await,
                    Err(msg) => {
                        eprintln!("{}", colored::Colorize::red(format!("Error: {msg}").as_str()));
                        exit_code::VALIDATION_ERROR
                    }
                }
            }
            SyncAction::Cancel { job_id } => cancel::execute(job_id),
            SyncAction::Status { job_id } => status::execute(job_id),
        },
    };

    std::process::exit(code);
}

#[allow(clippy::too_many_arguments)]
fn parse_run_args(
    organization_id: Uuid,
    sync_id: Uuid,
    source: String,
    source_config: String,
    destinations: Vec<String>,
    destination_configs: Vec<String>,
    profile: String,
    max_workers: Option<usize>,
    timeout_secs: u64,
) -> Result<run::RunArgs, String> {
    if destinations.is_empty() {
        return Err("at least one --destination is required".to_string());
    }
    let source_config: serde_json::Value =
        serde_json::from_str(&source_config).map_err(|e| format!("invalid --source-config: {e}"))?;
    let destination_configs = destination_configs
        .iter()
        .map(|s| serde_json::from_str(s).map_err(|e| format!("invalid --destination-config: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(run::RunArgs {
        organization_id,
        sync_id,
        source,
        source_config,
        destinations,
        destination_configs,
        profile,
        max_workers,
        timeout_secs,
    })
}

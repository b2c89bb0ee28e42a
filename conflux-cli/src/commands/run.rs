//! `conflux sync run` — builds a [`SyncContext`] for one sync connection,
//! runs the [`Orchestrator`] to completion (or until cancelled/timed out),
//! and reports the result as exit code plus a one-line JSON summary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use conflux_core::{EngineConfig, EngineError};
use conflux_data_sqlx::{PgEntityStateRepository, PgMembershipRepository};
use conflux_engine::dag::{Dag, DagEdge, DagNode, NodeKind};
use conflux_engine::{DagRouter, OrchestratorConfig, SyncContext, SyncCursor};
use conflux_events::progress::ProgressRegistry;
use conflux_scheduler::{run_with_deadline, JobOutcome, SyncJobRegistry};

use crate::connectors::build_registry;
use crate::exit_code;
use crate::job_store::{JobFileStatus, JobFileStore, JobStatusFile, CANCEL_POLL_INTERVAL};

pub struct RunArgs {
    pub organization_id: Uuid,
    pub sync_id: Uuid,
    pub source: String,
    pub source_config: serde_json::Value,
    pub destinations: Vec<String>,
    pub destination_configs: Vec<serde_json::Value>,
    pub profile: String,
    pub max_workers: Option<usize>,
    pub timeout_secs: u64,
}

/// A one-node-per-destination fan-out DAG: the source feeds every
/// destination directly, with no transformer stage. `--destination` can be
/// repeated to fan the same entity stream out to more than one store.
fn direct_dag(source: &str, destinations: &[String]) -> Result<Arc<DagRouter>, EngineError> {
    let mut nodes = vec![DagNode { id: source.to_string(), kind: NodeKind::Source, accepts: None }];
    let mut edges = Vec::new();
    for dest in destinations {
        nodes.push(DagNode { id: dest.clone(), kind: NodeKind::Destination, accepts: None });
        edges.push(DagEdge { from: source.to_string(), to: dest.clone() });
    }
    let dag = Dag::new(nodes, edges).map_err(|e| EngineError::Validation(e.to_string()))?;
    Ok(Arc::new(DagRouter::new(dag)))
}

pub async fn execute(args: RunArgs) -> i32 {
    let config = match EngineConfig::load(&args.profile) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("config error: {e}").as_str()));
            return exit_code::VALIDATION_ERROR;
        }
    };

    match run_inner(args, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
            exit_code::OPERATIONAL_ERROR
        }
    }
}

async fn run_inner(args: RunArgs, config: EngineConfig) -> Result<i32, EngineError> {
    let registry = build_registry();
    let source = registry.create_source(&args.source, args.source_config.clone())?;
    let destinations = args
        .destinations
        .iter()
        .zip(args.destination_configs.iter().cloned().chain(std::iter::repeat(serde_json::json!({}))))
        .map(|(name, cfg)| registry.create_destination(name, cfg))
        .collect::<Result<Vec<_>, _>>()?;

    let router = direct_dag(&args.source, &args.destinations)?;

    let pool = PgPoolOptions::new()
        .connect_lazy(&config.db_url)
        .map_err(|e| EngineError::StateStore(e.to_string()))?;
    let entity_state = Arc::new(PgEntityStateRepository::new(pool.clone()));
    let membership = Arc::new(PgMembershipRepository::new(pool));

    let ctx = SyncContext::new(
        source,
        destinations,
        router,
        HashMap::new(),
        entity_state,
        membership,
        ProgressRegistry::new(),
        SyncCursor::default(),
    );

    let job_registry = SyncJobRegistry::new();
    let (job_id, handle) = job_registry.create(args.sync_id);
    job_registry.mark_running(job_id);

    let store = JobFileStore::from_env();
    let _ = store.write_status(&JobStatusFile {
        job_id,
        sync_id: args.sync_id,
        status: JobFileStatus::Running,
        inserted: 0,
        updated: 0,
        already_sync: 0,
        failed: 0,
        removed: 0,
        error: None,
    });

    let cancel_token = handle.token();
    let poll_store = JobFileStore::from_env();
    let poll_handle = handle.clone();
    let poller = tokio::spawn(async move {
        loop {
            if poll_store.cancel_requested(job_id) {
                poll_handle.cancel();
                return;
            }
            if poll_handle.is_cancelled() {
                return;
            }
            tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
        }
    });

    let mut orchestrator_config = OrchestratorConfig::new(args.organization_id, args.sync_id, job_id);
    orchestrator_config.max_workers = args.max_workers.unwrap_or(config.max_workers);
    orchestrator_config.stream_buffer = config.stream_buffer;

    let outcome = run_with_deadline(&handle, Duration::from_secs(args.timeout_secs), async {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                cancel_token.cancel();
                Err(EngineError::Cancelled)
            }
            result = ctx.orchestrator(orchestrator_config).run(cancel_token.clone()) => result,
        }
    })
    .await;

    poller.abort();
    store.clear_cancel_flag(job_id);

    let (status_file, exit, result) = match outcome {
        JobOutcome::Cancelled => {
            job_registry.mark_cancelled(job_id);
            (JobFileStatus::Cancelled, exit_code::CANCELLED, None)
        }
        JobOutcome::TimedOut => {
            job_registry.mark_timed_out(job_id);
            (JobFileStatus::TimedOut, exit_code::TIMED_OUT, None)
        }
        JobOutcome::Completed(Ok(report)) => {
            job_registry.mark_completed(job_id);
            (JobFileStatus::Completed, exit_code::SUCCESS, Some(report))
        }
        JobOutcome::Completed(Err(e)) => {
            job_registry.mark_failed(job_id, e.to_string());
            let code = exit_code::for_engine_error(&e);
            let status = if code == exit_code::CANCELLED { JobFileStatus::Cancelled } else { JobFileStatus::Failed };
            let _ = store.write_status(&JobStatusFile {
                job_id,
                sync_id: args.sync_id,
                status,
                inserted: 0,
                updated: 0,
                already_sync: 0,
                failed: 0,
                removed: 0,
                error: Some(e.to_string()),
            });
            println!("{}", serde_json::json!({"job_id": job_id, "status": "failed", "error": e.to_string()}));
            return Ok(code);
        }
    };

    let report = result.unwrap_or_default();
    let _ = store.write_status(&JobStatusFile {
        job_id,
        sync_id: args.sync_id,
        status: status_file,
        inserted: report.inserted,
        updated: report.updated,
        already_sync: report.already_sync,
        failed: report.failed,
        removed: report.removed,
        error: None,
    });

    println!(
        "{}",
        serde_json::json!({
            "job_id": job_id,
            "inserted": report.inserted,
            "updated": report.updated,
            "already_sync": report.already_sync,
            "failed": report.failed,
            "removed": report.removed,
        })
    );

    Ok(exit)
}

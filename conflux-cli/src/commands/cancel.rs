//! `conflux sync cancel --job-id …` — drops the cancel-flag file a running
//! `sync run` process polls. Since the job registry is in-process only,
//! this command cannot confirm the job actually exists; it can only signal
//! intent and let `sync status` report whether it took effect.

use uuid::Uuid;

use crate::exit_code;
use crate::job_store::JobFileStore;

pub fn execute(job_id: Uuid) -> i32 {
    let store = JobFileStore::from_env();
    match store.request_cancel(job_id) {
        Ok(()) => {
            println!("{}", serde_json::json!({"job_id": job_id, "cancel_requested": true}));
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("failed to request cancellation: {e}").as_str()));
            exit_code::OPERATIONAL_ERROR
        }
    }
}

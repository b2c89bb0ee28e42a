//! `conflux sync status --job-id …` — reads the status file `sync run`
//! wrote, last. `None` means this process has never seen that job id (it
//! may be running on a different host, or the id was mistyped).

use uuid::Uuid;

use crate::exit_code;
use crate::job_store::JobFileStore;

pub fn execute(job_id: Uuid) -> i32 {
    let store = JobFileStore::from_env();
    match store.read_status(job_id) {
        Ok(Some(status)) => {
            println!("{}", serde_json::to_string_pretty(&status).expect("JobStatusFile always serializes"));
            exit_code::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}", colored::Colorize::red(format!("no known job with id '{job_id}'").as_str()));
            exit_code::VALIDATION_ERROR
        }
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("failed to read job status: {e}").as_str()));
            exit_code::OPERATIONAL_ERROR
        }
    }
}

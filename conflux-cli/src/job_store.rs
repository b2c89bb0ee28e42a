//! File-based bridge between `conflux sync run`, `cancel`, and `status`
//! invocations. [`conflux_scheduler::SyncJobRegistry`] is deliberately
//! in-process only (§9's REDESIGN FLAGS: no scheduler persistence), but each
//! CLI subcommand is its own OS process, so cross-invocation signaling needs
//! something outside the registry. A small state directory — one status
//! file and one cancel-flag file per job id — plays that role; `run` is the
//! only process that ever holds a live [`conflux_scheduler::SyncJobHandle`],
//! polling the flag file the same way it listens for Ctrl-C.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobFileStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusFile {
    pub job_id: Uuid,
    pub sync_id: Uuid,
    pub status: JobFileStatus,
    pub inserted: u64,
    pub updated: u64,
    pub already_sync: u64,
    pub failed: u64,
    pub removed: u64,
    pub error: Option<String>,
}

/// How often `run` checks the cancel-flag file between entity batches.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct JobFileStore {
    dir: PathBuf,
}

impl JobFileStore {
    /// Directory defaults to `.conflux/jobs` under the current working
    /// directory, overridable with `CONFLUX_STATE_DIR`.
    pub fn from_env() -> Self {
        let dir = std::env::var("CONFLUX_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".conflux/jobs"));
        Self { dir }
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn status_path(&self, job_id: Uuid) -> PathBuf {
        self.dir.join(format!("{job_id}.status.json"))
    }

    fn cancel_path(&self, job_id: Uuid) -> PathBuf {
        self.dir.join(format!("{job_id}.cancel"))
    }

    pub fn write_status(&self, status: &JobStatusFile) -> io::Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.status_path(status.job_id);
        let body = serde_json::to_vec_pretty(status).expect("JobStatusFile always serializes");
        fs::write(path, body)
    }

    pub fn read_status(&self, job_id: Uuid) -> io::Result<Option<JobStatusFile>> {
        let path = self.status_path(job_id);
        if !path.exists() {
            return Ok(None);
        }
        let body = fs::read(path)?;
        Ok(serde_json::from_slice(&body).ok())
    }

    /// Drop a sentinel file; `run` sees it on its next poll and cancels.
    pub fn request_cancel(&self, job_id: Uuid) -> io::Result<()> {
        ensure_dir(&self.dir)?;
        fs::write(self.cancel_path(job_id), b"")
    }

    pub fn cancel_requested(&self, job_id: Uuid) -> bool {
        self.cancel_path(job_id).exists()
    }

    /// Best-effort teardown once a job reaches a terminal state. Status stays
    /// on disk for `status` to read; only the cancel flag is transient.
    pub fn clear_cancel_flag(&self, job_id: Uuid) {
        let _ = fs::remove_file(self.cancel_path(job_id));
    }
}

fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

//! Sync-job status tracking and cancellation (§4.11). A job moves through
//! `Pending -> Running -> {Completed, Failed, Cancelled, TimedOut}`; this
//! crate owns the registry other components consult for `sync status` and
//! the cancellation token `sync cancel` flips.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SyncJobInfo {
    pub job_id: Uuid,
    pub sync_id: Uuid,
    pub status: SyncJobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Handle to one job's cancellation token. Cloneable and cheap; every
/// component participating in the job (producer, workers, ACL pipeline)
/// holds a clone and checks or awaits it.
#[derive(Clone)]
pub struct SyncJobHandle {
    cancel: CancellationToken,
}

impl SyncJobHandle {
    fn new() -> Self {
        Self { cancel: CancellationToken::new() }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The outcome of racing a job's work against its cancellation token and
/// wall-clock deadline.
pub enum JobOutcome<T> {
    Completed(T),
    Cancelled,
    TimedOut,
}

/// Run `fut` to completion unless `handle` is cancelled or `deadline`
/// elapses first — whichever comes first wins. Mirrors the two-level
/// timeout in §5: a per-call timeout lives inside the token manager, this
/// one is the job-wide deadline owned by the scheduler.
pub async fn run_with_deadline<F, T>(handle: &SyncJobHandle, deadline: Duration, fut: F) -> JobOutcome<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = handle.cancel.cancelled() => JobOutcome::Cancelled,
        _ = tokio::time::sleep(deadline) => JobOutcome::TimedOut,
        result = fut => JobOutcome::Completed(result),
    }
}

/// Registry of known sync jobs, queryable by `sync status` and mutated by
/// `sync cancel`. One process may run several jobs concurrently (one per
/// sync connection).
#[derive(Clone, Default)]
pub struct SyncJobRegistry {
    jobs: Arc<DashMap<Uuid, SyncJobInfo>>,
    handles: Arc<DashMap<Uuid, SyncJobHandle>>,
}

impl SyncJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `Pending` job and return its id plus cancellation handle.
    pub fn create(&self, sync_id: Uuid) -> (Uuid, SyncJobHandle) {
        let job_id = Uuid::new_v4();
        let handle = SyncJobHandle::new();
        self.jobs.insert(
            job_id,
            SyncJobInfo { job_id, sync_id, status: SyncJobStatus::Pending, started_at: None, error: None },
        );
        self.handles.insert(job_id, handle.clone());
        (job_id, handle)
    }

    pub fn mark_running(&self, job_id: Uuid) {
        if let Some(mut info) = self.jobs.get_mut(&job_id) {
            info.status = SyncJobStatus::Running;
            info.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&self, job_id: Uuid) {
        self.finish(job_id, SyncJobStatus::Completed, None);
    }

    pub fn mark_failed(&self, job_id: Uuid, error: String) {
        self.finish(job_id, SyncJobStatus::Failed, Some(error));
    }

    pub fn mark_cancelled(&self, job_id: Uuid) {
        self.finish(job_id, SyncJobStatus::Cancelled, None);
    }

    pub fn mark_timed_out(&self, job_id: Uuid) {
        self.finish(job_id, SyncJobStatus::TimedOut, None);
    }

    fn finish(&self, job_id: Uuid, status: SyncJobStatus, error: Option<String>) {
        if let Some(mut info) = self.jobs.get_mut(&job_id) {
            info.status = status;
            info.error = error;
        }
        self.handles.remove(&job_id);
    }

    pub fn status(&self, job_id: Uuid) -> Option<SyncJobInfo> {
        self.jobs.get(&job_id).map(|entry| entry.clone())
    }

    /// Cancel a running job. Returns `false` if the job is unknown or has
    /// already finished (cancelling a finished job is a no-op, not an error).
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.handles.get(&job_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_status_reports_pending() {
        let registry = SyncJobRegistry::new();
        let (job_id, _handle) = registry.create(Uuid::new_v4());
        assert_eq!(registry.status(job_id).unwrap().status, SyncJobStatus::Pending);
    }

    #[test]
    fn full_lifecycle_transitions() {
        let registry = SyncJobRegistry::new();
        let (job_id, _handle) = registry.create(Uuid::new_v4());
        registry.mark_running(job_id);
        assert_eq!(registry.status(job_id).unwrap().status, SyncJobStatus::Running);
        registry.mark_completed(job_id);
        assert_eq!(registry.status(job_id).unwrap().status, SyncJobStatus::Completed);
    }

    #[test]
    fn cancel_unknown_job_returns_false() {
        let registry = SyncJobRegistry::new();
        assert!(!registry.cancel(Uuid::new_v4()));
    }

    #[test]
    fn cancel_after_completion_is_a_noop() {
        let registry = SyncJobRegistry::new();
        let (job_id, _handle) = registry.create(Uuid::new_v4());
        registry.mark_completed(job_id);
        assert!(!registry.cancel(job_id));
    }

    #[tokio::test]
    async fn run_with_deadline_reports_cancellation() {
        let handle = SyncJobHandle::new();
        handle.cancel();
        let outcome = run_with_deadline(&handle, Duration::from_secs(5), async { 42 }).await;
        assert!(matches!(outcome, JobOutcome::Cancelled));
    }

    #[tokio::test]
    async fn run_with_deadline_reports_timeout() {
        let handle = SyncJobHandle::new();
        let outcome = run_with_deadline(&handle, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            42
        })
        .await;
        assert!(matches!(outcome, JobOutcome::TimedOut));
    }

    #[tokio::test]
    async fn run_with_deadline_returns_completed_result() {
        let handle = SyncJobHandle::new();
        let outcome = run_with_deadline(&handle, Duration::from_secs(5), async { 42 }).await;
        assert!(matches!(outcome, JobOutcome::Completed(42)));
    }
}

//! The terminal error surfaced on a sync job, plus the per-entity error
//! carried through the orchestrator's accounting.
//!
//! Conflux follows the hand-rolled `Display` + `std::error::Error` enum
//! convention throughout its crates rather than pulling in a derive-based
//! error library: each crate owns its own error type and converts at the
//! boundary via `From`.

/// Fatal, job-terminating errors. Anything that reaches this point marks the
/// sync job `Failed` and stops further processing.
#[derive(Debug)]
pub enum EngineError {
    /// Source or destination config failed validation before the job started.
    Validation(String),
    /// Authentication/refresh failed and no further retry is warranted.
    Auth(String),
    /// The entity state store (or membership table) could not be read/written.
    StateStore(String),
    /// The cursor could not be persisted at the end of a run.
    CursorPersistence(String),
    /// A transient I/O failure exhausted its retry budget.
    PermanentIo(String),
    /// The job was cancelled by an external caller.
    Cancelled,
    /// The job exceeded its configured wall-clock deadline.
    TimedOut,
    Other(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            EngineError::StateStore(msg) => write!(f, "entity state store error: {msg}"),
            EngineError::CursorPersistence(msg) => write!(f, "cursor persistence error: {msg}"),
            EngineError::PermanentIo(msg) => write!(f, "permanent I/O error: {msg}"),
            EngineError::Cancelled => write!(f, "sync job was cancelled"),
            EngineError::TimedOut => write!(f, "sync job exceeded its deadline"),
            EngineError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// A failure scoped to one entity. Logged and counted; never fatal to the job.
#[derive(Debug)]
pub struct EntityError {
    pub entity_id: String,
    pub message: String,
}

impl std::fmt::Display for EntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity '{}' failed: {}", self.entity_id, self.message)
    }
}

impl std::error::Error for EntityError {}

//! Maps a finished job's outcome to the process exit code documented in the
//! external interfaces: `0` success, `1` validation error, `2` operational
//! error, `3` cancelled, `4` timed out.

use conflux_core::EngineError;

pub const SUCCESS: i32 = 0;
pub const VALIDATION_ERROR: i32 = 1;
pub const OPERATIONAL_ERROR: i32 = 2;
pub const CANCELLED: i32 = 3;
pub const TIMED_OUT: i32 = 4;

pub fn for_engine_error(err: &EngineError) -> i32 {
    match err {
        EngineError::Validation(_) => VALIDATION_ERROR,
        EngineError::Cancelled => CANCELLED,
        EngineError::TimedOut => TIMED_OUT,
        EngineError::Auth(_)
        | EngineError::StateStore(_)
        | EngineError::CursorPersistence(_)
        | EngineError::PermanentIo(_)
        | EngineError::Other(_) => OPERATIONAL_ERROR,
    }
}

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum TokenError {
    /// The refresh endpoint rejected the refresh token or returned malformed data.
    RefreshFailed(String),
    /// Re-authentication after a 401 still failed.
    AuthFailed(String),
    /// All retry attempts were exhausted against a transient failure.
    RetriesExhausted { attempts: u32, last_status: Option<u16> },
    Http(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::RefreshFailed(msg) => write!(f, "token refresh failed: {msg}"),
            TokenError::AuthFailed(msg) => write!(f, "re-authentication failed: {msg}"),
            TokenError::RetriesExhausted { attempts, last_status } => {
                write!(f, "request failed after {attempts} attempts (last status: {last_status:?})")
            }
            TokenError::Http(msg) => write!(f, "http error: {msg}"),
        }
    }
}

impl Error for TokenError {}

impl From<reqwest::Error> for TokenError {
    fn from(err: reqwest::Error) -> Self {
        TokenError::Http(err.to_string())
    }
}

impl From<TokenError> for conflux_core::EngineError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::RefreshFailed(msg) | TokenError::AuthFailed(msg) => conflux_core::EngineError::Auth(msg),
            TokenError::RetriesExhausted { attempts, last_status } => {
                conflux_core::EngineError::PermanentIo(format!("exhausted {attempts} attempts, last status {last_status:?}"))
            }
            TokenError::Http(msg) => conflux_core::EngineError::PermanentIo(msg),
        }
    }
}

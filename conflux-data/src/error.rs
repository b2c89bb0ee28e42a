/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type. Used by backend
    /// crates (e.g. `conflux-data-sqlx`) to wrap driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "not found: {msg}"),
            DataError::Database(err) => write!(f, "database error: {err}"),
            DataError::Other(msg) => write!(f, "data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<DataError> for conflux_core::EngineError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(msg) => conflux_core::EngineError::StateStore(msg),
            DataError::Database(e) => conflux_core::EngineError::StateStore(e.to_string()),
            DataError::Other(msg) => conflux_core::EngineError::StateStore(msg),
        }
    }
}

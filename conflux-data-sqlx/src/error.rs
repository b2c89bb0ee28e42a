use conflux_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
/// implemented in `conflux-data` (which has no sqlx dependency). Use
/// `.into_data_error()` instead.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("row not found".into()),
            _ => DataError::database(self),
        }
    }
}

pub type SqlxResult<T> = Result<T, DataError>;

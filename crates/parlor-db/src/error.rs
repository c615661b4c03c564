use thiserror::Error;

/// Error kinds surfaced by the store. Every storage-layer failure is wrapped
/// into one of these at the query boundary; the API layer maps each kind to
/// an HTTP status without inspecting SQLite internals.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("database busy: transaction deadline exceeded")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
            {
                return StoreError::Timeout;
            }
            // Unique-constraint backstop: the schema rejects duplicate votes,
            // duplicate room pairs, and duplicate like/save rows even if two
            // requests race past the application-level checks.
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::Conflict("uniqueness constraint violated");
            }
        }
        StoreError::Sqlite(err)
    }
}

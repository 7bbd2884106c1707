use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Data-layer errors. SQLite failures that carry meaning for the caller
/// (duplicate rows, dangling references) are classified into the first four
/// variants here, so handlers never inspect vendor error codes.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or empty input, or a self-reference.
    #[error("{0}")]
    Validation(String),

    /// The caller is not allowed to act on the row (not a participant,
    /// not mutual followers, bad invite code).
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Constraint families recognised from SQLite extended result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
    Check,
    Other,
}

pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Constraint::Unique
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Constraint::ForeignKey,
                ffi::SQLITE_CONSTRAINT_CHECK => Constraint::Check,
                _ => Constraint::Other,
            })
        }
        _ => None,
    }
}

impl Error {
    /// Whether this is a raw unique / primary-key violation that has not
    /// been classified yet.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Sqlite(e) if constraint_kind(e) == Some(Constraint::Unique))
    }
}

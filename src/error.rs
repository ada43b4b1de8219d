use thiserror::Error;

/// Violations of the notification invariants, raised on construction and on Add.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum ValidationError {
    #[error("invalid notification ID: {id}")]
    InvalidId { id: i64 },

    #[error("notification timestamp cannot be empty")]
    EmptyTimestamp,

    #[error("invalid timestamp \"{input}\" (expected RFC3339)")]
    InvalidTimestamp { input: String },

    #[error("invalid read timestamp \"{input}\" (expected RFC3339)")]
    InvalidReadTimestamp { input: String },

    #[error("invalid notification state: {input}")]
    InvalidState { input: String },

    #[error("invalid notification level \"{input}\" (expected info, warning, error or critical)")]
    InvalidLevel { input: String },

    #[error("notification message cannot be empty")]
    EmptyMessage,

    #[error("{field} cannot be whitespace only")]
    WhitespaceOrigin { field: &'static str },
}

/// Repository errors shared by every storage backend.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("notification not found: id {id}")]
    NotFound { id: i64 },

    #[error("notification already dismissed: id {id}")]
    AlreadyDismissed { id: i64 },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        // Busy/locked means another process held the write lock past busy_timeout.
        if let rusqlite::Error::SqliteFailure(code, ref msg) = err
            && matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
        {
            return StoreError::Unavailable {
                reason: msg
                    .clone()
                    .unwrap_or_else(|| "database is locked".to_string()),
            };
        }
        StoreError::Sqlite(err)
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Failures resolving the origin pane. Never fatal: callers fall back to an
/// empty origin.
#[derive(Debug, Error)]
pub(crate) enum ContextError {
    #[error("not running inside tmux")]
    NotInMultiplexer,

    #[error("tmux not found in PATH")]
    NotFound,

    #[error("failed to run tmux: {0}")]
    Spawn(std::io::Error),

    #[error("failed to wait for tmux: {0}")]
    Wait(std::io::Error),

    #[error("tmux did not answer within {ms}ms")]
    Timeout { ms: u128 },

    #[error("tmux error: {0}")]
    Failed(String),

    #[error("unexpected tmux output: {0:?}")]
    Malformed(String),
}

/// Top-level error surfaced by the CLI.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid notification ID \"{input}\"")]
    InvalidId { input: String },

    #[error("invalid level: {input}")]
    InvalidLevel { input: String },

    #[error("invalid duration \"{input}\" (expected e.g. 30s, 5m, 2h, 1d)")]
    InvalidDuration { input: String },

    #[error("dismiss-by needs at least one of --session, --window, --pane")]
    MissingOrigin,

    #[error("no state directory configured (set INTRAY_STATE_DIR or state_dir in config)")]
    NoStateDir,

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_level() {
        let e = ValidationError::InvalidLevel {
            input: "loud".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "invalid notification level \"loud\" (expected info, warning, error or critical)"
        );
    }

    #[test]
    fn validation_error_display_origin() {
        let e = ValidationError::WhitespaceOrigin { field: "session" };
        assert_eq!(e.to_string(), "session cannot be whitespace only");
    }

    #[test]
    fn store_error_from_validation() {
        let e: StoreError = ValidationError::EmptyMessage.into();
        assert!(matches!(e, StoreError::Validation(ValidationError::EmptyMessage)));
        assert_eq!(
            e.to_string(),
            "validation error: notification message cannot be empty"
        );
    }

    #[test]
    fn store_error_not_found_display() {
        let e = StoreError::NotFound { id: 42 };
        assert_eq!(e.to_string(), "notification not found: id 42");
    }

    #[test]
    fn busy_sqlite_error_maps_to_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        let e: StoreError = err.into();
        assert!(matches!(e, StoreError::Unavailable { .. }));
    }

    #[test]
    fn other_sqlite_error_stays_sqlite() {
        let e: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(e, StoreError::Sqlite(_)));
    }

    #[test]
    fn context_error_timeout_display() {
        let e = ContextError::Timeout { ms: 2000 };
        assert_eq!(e.to_string(), "tmux did not answer within 2000ms");
    }

    #[test]
    fn app_error_wraps_store_error_transparently() {
        let app: AppError = StoreError::NotFound { id: 7 }.into();
        assert_eq!(app.to_string(), "notification not found: id 7");
    }
}

/// Timestamp format written by the core: "2025-01-15T09:30:00Z"
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Display name for a group whose key is empty
pub(crate) const EMPTY_GROUP_LABEL: &str = "(empty)";

/// Default time to wait for the storage lock before giving up
pub(crate) const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

/// Default time to wait for the multiplexer to answer a context query
pub(crate) const DEFAULT_CONTEXT_TIMEOUT_MS: u64 = 2_000;

/// Environment variable overriding the state directory
pub(crate) const STATE_DIR_ENV: &str = "INTRAY_STATE_DIR";

/// Environment variable overriding the storage backend
pub(crate) const BACKEND_ENV: &str = "INTRAY_BACKEND";

/// Environment variable controlling the log filter
pub(crate) const LOG_ENV: &str = "INTRAY_LOG";

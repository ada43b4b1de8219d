//! Storage repository
//!
//! [`Store`] is the persistence boundary. Each backend is an independent
//! implementation that must pass the shared conformance suite; nothing
//! above this module branches on the backend type.

pub(crate) mod file;
mod lock;
pub(crate) mod migrate;
pub(crate) mod sqlite;
mod tsv;

#[cfg(test)]
mod conformance;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{Filter, NewNotification, Notification, State};
use crate::error::StoreResult;
use crate::utils::days_before;

pub(crate) use file::FileStore;
pub(crate) use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Backend {
    #[default]
    Tsv,
    Sqlite,
}

impl Backend {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "tsv" | "file" => Some(Backend::Tsv),
            "sqlite" => Some(Backend::Sqlite),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Backend::Tsv => "tsv",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Location of this backend's data inside `state_dir`
    pub(crate) fn data_path(self, state_dir: &Path) -> PathBuf {
        match self {
            Backend::Tsv => state_dir.join(file::TSV_FILE),
            Backend::Sqlite => state_dir.join(sqlite::DB_FILE),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Store::cleanup_old`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct CleanupReport {
    /// IDs eligible for deletion, ascending
    pub(crate) candidates: Vec<i64>,
    /// Number actually deleted; zero on a dry run
    pub(crate) deleted: usize,
}

pub(crate) trait Store {
    fn backend(&self) -> Backend;

    /// Validate and persist, returning the newly assigned ID.
    fn add(&self, new: NewNotification) -> StoreResult<i64>;

    /// Records matching `filter`, ascending by ID.
    fn list(&self, filter: &Filter) -> StoreResult<Vec<Notification>>;

    fn get(&self, id: i64) -> StoreResult<Notification>;

    /// Fails with `NotFound` or `AlreadyDismissed`.
    fn dismiss(&self, id: i64) -> StoreResult<()>;

    /// Returns the number of records dismissed.
    fn dismiss_all(&self) -> StoreResult<usize>;

    /// Dismiss active records from an origin. Empty arguments match anything.
    fn dismiss_by_filter(&self, session: &str, window: &str, pane: &str) -> StoreResult<usize>;

    fn mark_read(&self, id: i64) -> StoreResult<()>;

    fn mark_unread(&self, id: i64) -> StoreResult<()>;

    /// Delete dismissed records created more than `days` days ago; `0`
    /// selects every dismissed record.
    fn cleanup_old(&self, days: u32, dry_run: bool) -> StoreResult<CleanupReport>;

    fn active_count(&self) -> StoreResult<usize>;
}

/// Dismissed records eligible for cleanup, ascending by ID.
pub(crate) fn cleanup_candidates<'a>(
    records: impl IntoIterator<Item = &'a Notification>,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<i64> {
    let cutoff = (days > 0).then(|| days_before(now, days));
    let mut ids: Vec<i64> = records
        .into_iter()
        .filter(|n| n.state == State::Dismissed)
        .filter(|n| match &cutoff {
            Some(cutoff) => n.timestamp.as_str() < cutoff.as_str(),
            None => true,
        })
        .map(|n| n.id)
        .collect();
    ids.sort_unstable();
    ids
}

#[derive(Debug, Clone)]
pub(crate) struct StoreOptions {
    pub(crate) backend: Backend,
    pub(crate) state_dir: PathBuf,
    pub(crate) lock_timeout: Duration,
}

/// Construct the configured backend. Called once at startup.
///
/// The first time SQLite is selected next to a non-empty TSV store, the
/// TSV records are imported. If that fails the TSV store is used instead.
pub(crate) fn open_store(opts: &StoreOptions) -> StoreResult<Box<dyn Store>> {
    Ok(match opts.backend {
        Backend::Tsv => Box::new(FileStore::open(&opts.state_dir, opts.lock_timeout)?),
        Backend::Sqlite => {
            let db_path = opts.backend.data_path(&opts.state_dir);
            let tsv_path = Backend::Tsv.data_path(&opts.state_dir);
            match migrate::auto_migrate(&tsv_path, &db_path, opts.lock_timeout) {
                Ok(Some(report)) => log::info!(
                    "event=auto_migration_complete migrated={} skipped={}",
                    report.migrated_rows,
                    report.skipped_rows
                ),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("event=auto_migration_failed fallback=tsv error=\"{e}\"");
                    return Ok(Box::new(FileStore::open(&opts.state_dir, opts.lock_timeout)?));
                }
            }
            Box::new(SqliteStore::open(&db_path, opts.lock_timeout)?)
        }
    })
}

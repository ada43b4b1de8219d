//! One-shot import of a TSV store into SQLite
//!
//! The latest valid version of each record is upserted with its original
//! ID inside one transaction, so re-running is idempotent. Malformed lines
//! are skipped with a warning. A copy of the TSV is taken before anything
//! is written and an existing copy is never overwritten.
//!
//! [`auto_migrate`] runs the import the first time the SQLite backend is
//! opened next to a non-empty TSV store, and removes a half-built database
//! if it fails.

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::file::LOCK_DIR;
use super::lock::DirLock;
use super::sqlite::SqliteStore;
use super::tsv::fold_latest;
use crate::core::Notification;
use crate::error::AppError;

const BACKUP_SUFFIX: &str = ".sqlite-migration.bak";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct MigrationReport {
    pub(crate) total_rows: usize,
    pub(crate) migrated_rows: usize,
    pub(crate) skipped_rows: usize,
    pub(crate) duplicate_rows: usize,
    pub(crate) backup_path: Option<PathBuf>,
    pub(crate) dry_run: bool,
}

pub(crate) fn backup_path(tsv_path: &Path) -> PathBuf {
    let mut name = tsv_path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Import `tsv_path` into `db`. With `dry_run` the TSV is parsed and
/// counted but nothing is written.
pub(crate) fn migrate_tsv_to_sqlite(
    tsv_path: &Path,
    db: &SqliteStore,
    dry_run: bool,
) -> Result<MigrationReport, AppError> {
    let content = match fs::read(tsv_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::Migration(format!(
                "no TSV store at {}",
                tsv_path.display()
            )));
        }
        Err(e) => return Err(AppError::Migration(format!("read {}: {e}", tsv_path.display()))),
    };

    let folded = fold_latest(&content);
    let records: Vec<Notification> = folded.records.into_values().collect();
    let mut report = MigrationReport {
        total_rows: folded.lines,
        migrated_rows: records.len(),
        skipped_rows: folded.skipped,
        duplicate_rows: folded.superseded,
        backup_path: None,
        dry_run,
    };
    if dry_run {
        return Ok(report);
    }

    let backup = backup_path(tsv_path);
    if backup.exists() {
        return Err(AppError::Migration(format!(
            "backup {} already exists; move it aside before migrating again",
            backup.display()
        )));
    }
    fs::copy(tsv_path, &backup)
        .map_err(|e| AppError::Migration(format!("create backup {}: {e}", backup.display())))?;
    report.backup_path = Some(backup);

    report.migrated_rows = db.upsert_all(&records)?;
    log::info!(
        "event=migration_complete total={} migrated={} skipped={} duplicates={}",
        report.total_rows,
        report.migrated_rows,
        report.skipped_rows,
        report.duplicate_rows
    );
    Ok(report)
}

fn has_content(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.len() > 0)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Delete the database and its WAL files, plus the backup if this run made it.
fn rollback(db_path: &Path, backup: Option<&Path>) -> std::io::Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        remove_if_present(Path::new(&name))?;
    }
    if let Some(backup) = backup {
        remove_if_present(backup)?;
    }
    Ok(())
}

/// Import the TSV store into a database that does not exist yet.
///
/// Returns `Ok(None)` when there is nothing to do. Runs under the TSV lock
/// so concurrent first starts migrate once.
pub(crate) fn auto_migrate(
    tsv_path: &Path,
    db_path: &Path,
    lock_timeout: Duration,
) -> Result<Option<MigrationReport>, AppError> {
    if db_path.exists() || !has_content(tsv_path) {
        return Ok(None);
    }
    let lock_dir = tsv_path.with_file_name(LOCK_DIR);
    let _guard = DirLock::acquire(&lock_dir, lock_timeout)?;
    if db_path.exists() {
        return Ok(None);
    }

    log::info!("event=auto_migration_start tsv={}", tsv_path.display());
    let had_backup = backup_path(tsv_path).exists();
    let result = SqliteStore::open(db_path, lock_timeout)
        .map_err(AppError::from)
        .and_then(|db| migrate_tsv_to_sqlite(tsv_path, &db, false));

    match result {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            let backup = backup_path(tsv_path);
            let made_backup = (!had_backup).then_some(backup.as_path());
            if let Err(rollback_err) = rollback(db_path, made_backup) {
                return Err(AppError::Migration(format!(
                    "{e} (rollback failed: {rollback_err})"
                )));
            }
            Err(e)
        }
    }
}

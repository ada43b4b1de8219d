//! Flat-file backend: an append-only TSV version log
//!
//! Every mutation appends a full copy of each changed record; the last line
//! for an ID is its current state. Mutations run under [`DirLock`] and
//! publish with a single `write_all` on an `O_APPEND` handle. Readers take
//! no lock and ignore an unterminated final line, so they only ever see
//! whole records. A writer that finds such a line while holding the lock
//! knows its author died mid-append and cuts it off before appending.
//! Cleanup compacts the log through a temp file and rename.
//!
//! `notifications.seq` holds the highest ID ever issued so compaction can
//! never make an ID reusable.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use super::lock::DirLock;
use super::tsv::{complete_len, encode_line, fold_latest};
use super::{Backend, CleanupReport, Store, cleanup_candidates};
use crate::core::{Filter, NewNotification, Notification, State, filter_notifications};
use crate::error::{StoreError, StoreResult};
use crate::utils::now_rfc3339;

pub(crate) const TSV_FILE: &str = "notifications.tsv";
const SEQ_FILE: &str = "notifications.seq";
pub(super) const LOCK_DIR: &str = "notifications.lock";

#[derive(Debug)]
pub(crate) struct FileStore {
    tsv_path: PathBuf,
    seq_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub(crate) fn open(dir: &Path, lock_timeout: Duration) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        let store = Self {
            tsv_path: dir.join(TSV_FILE),
            seq_path: dir.join(SEQ_FILE),
            lock_path: dir.join(LOCK_DIR),
            lock_timeout,
        };
        log::debug!("event=store_open backend=tsv path={}", store.tsv_path.display());
        Ok(store)
    }

    fn load(&self) -> StoreResult<BTreeMap<i64, Notification>> {
        match fs::read(&self.tsv_path) {
            Ok(content) => Ok(fold_latest(&content).records),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let _guard = DirLock::acquire(&self.lock_path, self.lock_timeout)?;
        f()
    }

    fn append(&self, records: &[Notification]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let buf: String = records.iter().map(encode_line).collect();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.tsv_path)?;
        self.truncate_torn_tail(&mut file)?;
        file.write_all(buf.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Drop an unterminated last line. Only called with the lock held, so
    /// the fragment cannot belong to a live writer.
    fn truncate_torn_tail(&self, file: &mut File) -> StoreResult<()> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut content = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut content)?;
        let keep = complete_len(&content) as u64;
        file.set_len(keep)?;
        log::warn!(
            "event=tsv_torn_tail_truncated path={} dropped_bytes={}",
            self.tsv_path.display(),
            len - keep
        );
        Ok(())
    }

    fn last_issued_id(&self, records: &BTreeMap<i64, Notification>) -> StoreResult<i64> {
        let from_log = records.keys().next_back().copied().unwrap_or(0);
        let from_seq = match fs::read_to_string(&self.seq_path) {
            Ok(s) => s.trim().parse::<i64>().unwrap_or_else(|_| {
                log::warn!("event=seq_corrupt path={}", self.seq_path.display());
                0
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(from_log.max(from_seq))
    }

    fn replace_file(&self, path: &Path, contents: &[u8]) -> StoreResult<()> {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply `change` to one record under the lock and append the new version.
    fn update(
        &self,
        id: i64,
        change: impl FnOnce(&mut Notification) -> StoreResult<()>,
    ) -> StoreResult<()> {
        self.with_lock(|| {
            let records = self.load()?;
            let mut record = records
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound { id })?;
            change(&mut record)?;
            record.validate()?;
            self.append(std::slice::from_ref(&record))
        })
    }

    fn dismiss_matching(&self, filter: &Filter) -> StoreResult<usize> {
        self.with_lock(|| {
            let records = self.load()?;
            let changed: Vec<Notification> = records
                .into_values()
                .filter(|n| n.is_active() && filter.matches(n))
                .map(|mut n| {
                    n.state = State::Dismissed;
                    n
                })
                .collect();
            self.append(&changed)?;
            Ok(changed.len())
        })
    }
}

impl Store for FileStore {
    fn backend(&self) -> Backend {
        Backend::Tsv
    }

    fn add(&self, new: NewNotification) -> StoreResult<i64> {
        new.validate()?;
        self.with_lock(|| {
            let records = self.load()?;
            let id = self.last_issued_id(&records)? + 1;
            let record = new.into_notification(id, &now_rfc3339())?;
            self.replace_file(&self.seq_path, id.to_string().as_bytes())?;
            self.append(std::slice::from_ref(&record))?;
            log::debug!("event=notification_added backend=tsv id={id}");
            Ok(id)
        })
    }

    fn list(&self, filter: &Filter) -> StoreResult<Vec<Notification>> {
        let records: Vec<Notification> = self.load()?.into_values().collect();
        Ok(filter_notifications(&records, filter))
    }

    fn get(&self, id: i64) -> StoreResult<Notification> {
        self.load()?
            .remove(&id)
            .ok_or(StoreError::NotFound { id })
    }

    fn dismiss(&self, id: i64) -> StoreResult<()> {
        self.update(id, |n| {
            if n.state == State::Dismissed {
                return Err(StoreError::AlreadyDismissed { id });
            }
            n.state = State::Dismissed;
            Ok(())
        })
    }

    fn dismiss_all(&self) -> StoreResult<usize> {
        self.dismiss_matching(&Filter::default())
    }

    fn dismiss_by_filter(&self, session: &str, window: &str, pane: &str) -> StoreResult<usize> {
        self.dismiss_matching(&Filter::origin(session, window, pane))
    }

    fn mark_read(&self, id: i64) -> StoreResult<()> {
        self.update(id, |n| {
            n.read_timestamp = now_rfc3339();
            Ok(())
        })
    }

    fn mark_unread(&self, id: i64) -> StoreResult<()> {
        self.update(id, |n| {
            n.read_timestamp.clear();
            Ok(())
        })
    }

    fn cleanup_old(&self, days: u32, dry_run: bool) -> StoreResult<CleanupReport> {
        self.with_lock(|| {
            let mut records = self.load()?;
            let candidates = cleanup_candidates(records.values(), days, Utc::now());
            if dry_run || candidates.is_empty() {
                return Ok(CleanupReport {
                    candidates,
                    deleted: 0,
                });
            }

            let last_id = self.last_issued_id(&records)?;
            self.replace_file(&self.seq_path, last_id.to_string().as_bytes())?;
            for id in &candidates {
                records.remove(id);
            }
            let compacted: String = records.values().map(encode_line).collect();
            self.replace_file(&self.tsv_path, compacted.as_bytes())?;
            log::info!(
                "event=cleanup backend=tsv deleted={} kept={}",
                candidates.len(),
                records.len()
            );
            Ok(CleanupReport {
                deleted: candidates.len(),
                candidates,
            })
        })
    }

    fn active_count(&self) -> StoreResult<usize> {
        Ok(self.load()?.values().filter(|n| n.is_active()).count())
    }
}

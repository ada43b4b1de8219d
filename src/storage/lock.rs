//! Inter-process exclusive lock backed by a directory
//!
//! `mkdir` either creates the directory or fails with `AlreadyExists`, so
//! exactly one process holds the lock at a time. The guard removes the
//! directory on drop.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};

const LOCK_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub(crate) struct DirLock {
    path: PathBuf,
}

impl DirLock {
    /// Block until the lock is acquired or `timeout` elapses.
    pub(crate) fn acquire(path: &Path, timeout: Duration) -> StoreResult<Self> {
        let start = Instant::now();
        loop {
            match fs::create_dir(path) {
                Ok(()) => {
                    log::debug!(
                        "event=lock_acquired path={} wait_ms={}",
                        path.display(),
                        start.elapsed().as_millis()
                    );
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        log::warn!(
                            "event=lock_timeout path={} timeout_ms={}",
                            path.display(),
                            timeout.as_millis()
                        );
                        return Err(StoreError::Unavailable {
                            reason: format!(
                                "timed out after {}ms waiting for lock {}",
                                timeout.as_millis(),
                                path.display()
                            ),
                        });
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir(&self.path) {
            log::warn!(
                "event=lock_release_failed path={} error=\"{e}\"",
                self.path.display()
            );
        } else {
            log::debug!("event=lock_released path={}", self.path.display());
        }
    }
}

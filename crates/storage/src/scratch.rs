//! Local download copies owned by one session.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::StorageError;

#[derive(Debug)]
pub struct ScratchFiles {
    dir: PathBuf,
    tracked: Vec<PathBuf>,
    attempts: u32,
    backoff: Duration,
}

impl ScratchFiles {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            tracked: Vec::new(),
            attempts: 5,
            backoff: Duration::from_millis(500),
        })
    }

    /// How many deletion rounds [`cleanup`](Self::cleanup) runs and how long
    /// it waits between them.
    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a scratch copy named `name`, registered for deletion.
    pub fn path_for(&mut self, name: &str) -> PathBuf {
        let path = self.dir.join(name);
        self.mark_for_deletion(&path);
        path
    }

    pub fn mark_for_deletion(&mut self, path: &Path) {
        if !self.tracked.iter().any(|p| p == path) {
            self.tracked.push(path.to_path_buf());
        }
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    /// Tracked copies another process currently holds open.
    pub fn open_files(&self) -> Vec<PathBuf> {
        self.tracked
            .iter()
            .filter(|p| p.exists() && is_in_use(p))
            .cloned()
            .collect()
    }

    /// Delete every tracked copy, retrying locked ones. Returns the files
    /// still present after the last round.
    pub fn cleanup(&mut self) -> Vec<PathBuf> {
        let mut pending = std::mem::take(&mut self.tracked);
        for round in 0..self.attempts {
            pending.retain(|path| match fs::remove_file(path) {
                Ok(()) => {
                    debug!(path = %path.display(), "deleted scratch file");
                    false
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, round, "scratch file still locked");
                    true
                }
            });
            if pending.is_empty() {
                break;
            }
            if round + 1 < self.attempts {
                thread::sleep(self.backoff);
            }
        }
        for path in &pending {
            warn!(path = %path.display(), "could not delete scratch file");
        }
        self.tracked = pending.clone();
        pending
    }
}

/// A file is in use when it cannot be renamed onto itself.
pub fn is_in_use(path: &Path) -> bool {
    fs::rename(path, path).is_err()
}

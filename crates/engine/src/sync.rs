//! Download/upload of one inventory file with optimistic concurrency.

use std::fs;
use std::path::Path;

use labinv_storage::{RemoteError, RemoteId, RemoteStore, VersionToken};
use tracing::{info, warn};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Downloading,
    Loaded,
    Uploading,
    /// The remote copy moved on under us. Terminal for this coordinator.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Updated { version: VersionToken },
    /// The file had no remote copy yet; this is its new id.
    Created { id: RemoteId, version: VersionToken },
}

impl UploadOutcome {
    pub fn version(&self) -> &VersionToken {
        match self {
            Self::Updated { version } | Self::Created { version, .. } => version,
        }
    }
}

/// Tracks the remote id and captured version token of one file.
#[derive(Debug)]
pub struct SyncCoordinator {
    name: String,
    state: SyncState,
    remote_id: Option<RemoteId>,
    version: Option<VersionToken>,
}

impl SyncCoordinator {
    /// `name` is the blob name used when the file has to be created.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: SyncState::Idle,
            remote_id: None,
            version: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    /// Fetch `id` into `dest` and capture its version token.
    pub fn download<S: RemoteStore>(
        &mut self,
        store: &S,
        id: Option<&RemoteId>,
        dest: &Path,
    ) -> Result<VersionToken, EngineError> {
        if self.state == SyncState::Stale {
            return Err(EngineError::SessionStale);
        }
        self.state = SyncState::Downloading;

        let result = match id.filter(|id| !id.is_empty()) {
            None => Err(RemoteError::MissingId),
            Some(id) => store.get(id),
        };
        let blob = match result {
            Ok(blob) => blob,
            Err(e) => {
                self.state = SyncState::Idle;
                warn!(file = %self.name, code = e.code(), error = %e, "download failed");
                return Err(e.into());
            }
        };

        if let Err(e) = fs::write(dest, &blob.bytes) {
            self.state = SyncState::Idle;
            return Err(EngineError::Storage(e.into()));
        }

        info!(file = %self.name, id = %blob.id, bytes = blob.bytes.len(), "downloaded");
        self.remote_id = Some(blob.id);
        self.version = Some(blob.version.clone());
        self.state = SyncState::Loaded;
        Ok(blob.version)
    }

    /// Start from a local file that has no remote copy yet.
    pub fn adopt_local(&mut self) {
        self.remote_id = None;
        self.version = None;
        self.state = SyncState::Loaded;
    }

    /// Push `source` to the remote store.
    ///
    /// An existing blob is only written when its current token still equals
    /// the captured one; otherwise the coordinator turns `Stale` and the
    /// remote bytes stay as they were. A file without a remote copy is
    /// created under `parent`.
    pub fn upload<S: RemoteStore>(
        &mut self,
        store: &mut S,
        source: &Path,
        parent: Option<&RemoteId>,
    ) -> Result<UploadOutcome, EngineError> {
        if self.state == SyncState::Stale {
            return Err(EngineError::SessionStale);
        }
        let bytes = fs::read(source).map_err(|e| EngineError::Storage(e.into()))?;
        self.state = SyncState::Uploading;

        let result = match (&self.remote_id, &self.version) {
            (Some(id), Some(captured)) => self.update_existing(store, id, &bytes, captured),
            _ => store
                .create(&self.name, &bytes, parent)
                .map(|(id, version)| UploadOutcome::Created { id, version }),
        };

        match result {
            Ok(outcome) => {
                if let UploadOutcome::Created { id, .. } = &outcome {
                    info!(file = %self.name, %id, "created remote file");
                    self.remote_id = Some(id.clone());
                } else {
                    info!(file = %self.name, bytes = bytes.len(), "uploaded");
                }
                self.version = Some(outcome.version().clone());
                self.state = SyncState::Idle;
                Ok(outcome)
            }
            Err(e @ RemoteError::StaleFile { .. }) => {
                warn!(file = %self.name, error = %e, "upload rejected; remote copy changed");
                self.state = SyncState::Stale;
                Err(e.into())
            }
            Err(e) => {
                warn!(file = %self.name, code = e.code(), error = %e, "upload failed");
                self.state = SyncState::Loaded;
                Err(e.into())
            }
        }
    }

    fn update_existing<S: RemoteStore>(
        &self,
        store: &mut S,
        id: &RemoteId,
        bytes: &[u8],
        captured: &VersionToken,
    ) -> Result<UploadOutcome, RemoteError> {
        let current = store.version(id)?;
        if &current != captured {
            return Err(RemoteError::StaleFile {
                id: id.clone(),
                expected: captured.clone(),
                current,
            });
        }
        let version = store.update(id, bytes, captured)?;
        Ok(UploadOutcome::Updated { version })
    }
}

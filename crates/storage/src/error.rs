use thiserror::Error;

use crate::traits::{RemoteId, VersionToken};

/// Local persistence faults: workbook files, the registry file, scratch
/// copies, the blob store database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("workbook read error: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("sheet '{sheet}' not found in {path}")]
    SheetNotFound { sheet: String, path: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] labinv_core::CoreError),
}

/// What the user can do about a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Supply a new remote id for the logical file and try again.
    ReplaceIdentifier,
    /// Nothing to fix here; remedy outside the app and retry by hand.
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("No file ID provided")]
    MissingId,

    #[error("File {id} not found")]
    NotFound { id: RemoteId },

    #[error("Permission denied for file {id}")]
    PermissionDenied { id: RemoteId },

    #[error(
        "File {id} was modified by someone else (expected version {expected}, found {current}). Reopen it and try again."
    )]
    StaleFile {
        id: RemoteId,
        expected: VersionToken,
        current: VersionToken,
    },

    #[error("Content of {id} failed its integrity check")]
    Corrupt { id: RemoteId },

    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::MissingId | Self::NotFound { .. } => Recovery::ReplaceIdentifier,
            Self::PermissionDenied { .. }
            | Self::StaleFile { .. }
            | Self::Corrupt { .. }
            | Self::Transport(_) => Recovery::Terminal,
        }
    }

    /// Stable error class name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingId => "MISSING_ID",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::StaleFile { .. } => "STALE_FILE_ERROR",
            Self::Corrupt { .. } => "CORRUPT",
            Self::Transport(_) => "HTTP_ERROR",
        }
    }
}

impl From<rusqlite::Error> for RemoteError {
    fn from(err: rusqlite::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

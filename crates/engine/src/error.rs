use labinv_core::{CoreError, ValidationError};
use labinv_storage::{RemoteError, StorageError};
use thiserror::Error;

/// A proposed batch collides with the record set. Nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("Error: {field}(s) {} already occupied.", .locations.join(", "))]
    Occupied { field: String, locations: Vec<String> },

    #[error("Error: {field}(s) {} do not exist in the inventory.", .locations.join(", "))]
    Missing { field: String, locations: Vec<String> },

    #[error("Please enter at least one {field}.")]
    NoLocations { field: String },

    #[error("Please fill in: {field}")]
    IncompleteKey { field: String },
}

impl ConflictError {
    /// Offending locations, empty for the field-level variants.
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Occupied { locations, .. } | Self::Missing { locations, .. } => locations,
            Self::NoLocations { .. } | Self::IncompleteKey { .. } => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("config error: {0}")]
    Config(String),

    #[error("no removal is awaiting confirmation")]
    NoPendingRemoval,

    #[error("The inventory changed since the removal was previewed. Submit it again.")]
    StalePlan,

    #[error(
        "The file you are attempting to update has been modified since your download. Reopen the inventory and try again."
    )]
    SessionStale,
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

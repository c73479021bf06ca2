use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Stable identifier of a blob or container in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque last-modified marker. Returned by every read, required by every
/// write of an existing blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteBlob {
    pub id: RemoteId,
    pub name: String,
    pub bytes: Vec<u8>,
    pub version: VersionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: RemoteId,
    pub name: String,
    pub is_container: bool,
}

/// A blob store with optimistic concurrency on a per-blob version token.
///
/// Implementations reject an empty id with [`RemoteError::MissingId`] before
/// touching anything.
pub trait RemoteStore {
    fn get(&self, id: &RemoteId) -> Result<RemoteBlob, RemoteError>;

    /// Current token without fetching the content.
    fn version(&self, id: &RemoteId) -> Result<VersionToken, RemoteError>;

    fn create(
        &mut self,
        name: &str,
        bytes: &[u8],
        parent: Option<&RemoteId>,
    ) -> Result<(RemoteId, VersionToken), RemoteError>;

    /// Replace the content of `id`, but only if its token is still
    /// `expected`; otherwise nothing is written and `StaleFile` comes back.
    fn update(
        &mut self,
        id: &RemoteId,
        bytes: &[u8],
        expected: &VersionToken,
    ) -> Result<VersionToken, RemoteError>;

    fn create_container(
        &mut self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError>;

    /// Direct children of `container` whose name matches `pattern`.
    fn list_children(
        &self,
        container: &RemoteId,
        pattern: &Regex,
    ) -> Result<Vec<RemoteEntry>, RemoteError>;
}

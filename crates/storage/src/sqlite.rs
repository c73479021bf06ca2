use chrono::{SecondsFormat, Utc};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RemoteError, StorageError};
use crate::traits::{RemoteBlob, RemoteEntry, RemoteId, RemoteStore, VersionToken};

/// `RemoteStore` backed by one SQLite file. Several handles may open the
/// same file; the version check and the write happen in one immediate
/// transaction, so concurrent writers cannot both pass the check.
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Grant or revoke write access to a blob.
    pub fn set_writable(&mut self, id: &RemoteId, writable: bool) -> Result<(), RemoteError> {
        require_id(id)?;
        let changed = self.conn.execute(
            "UPDATE objects SET writable = ?1 WHERE object_id = ?2",
            rusqlite::params![writable, id.as_str()],
        )?;
        if changed == 0 {
            return Err(RemoteError::NotFound { id: id.clone() });
        }
        Ok(())
    }
}

fn require_id(id: &RemoteId) -> Result<(), RemoteError> {
    if id.is_empty() {
        Err(RemoteError::MissingId)
    } else {
        Ok(())
    }
}

fn new_token(generation: i64) -> VersionToken {
    VersionToken::new(format!(
        "{}#{generation}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    ))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

struct FileRow {
    name: String,
    content: Vec<u8>,
    checksum: Vec<u8>,
    version: String,
}

impl RemoteStore for SqliteBlobStore {
    fn get(&self, id: &RemoteId) -> Result<RemoteBlob, RemoteError> {
        require_id(id)?;
        let row = self
            .conn
            .query_row(
                "SELECT name, content, checksum, version FROM objects WHERE object_id = ?1 AND is_container = 0",
                rusqlite::params![id.as_str()],
                |row| {
                    Ok(FileRow {
                        name: row.get(0)?,
                        content: row.get(1)?,
                        checksum: row.get(2)?,
                        version: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| RemoteError::NotFound { id: id.clone() })?;

        if blake3::hash(&row.content).as_bytes().as_slice() != row.checksum.as_slice() {
            return Err(RemoteError::Corrupt { id: id.clone() });
        }

        Ok(RemoteBlob {
            id: id.clone(),
            name: row.name,
            bytes: row.content,
            version: VersionToken::new(row.version),
        })
    }

    fn version(&self, id: &RemoteId) -> Result<VersionToken, RemoteError> {
        require_id(id)?;
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT version FROM objects WHERE object_id = ?1 AND is_container = 0",
                rusqlite::params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        version
            .map(VersionToken::new)
            .ok_or_else(|| RemoteError::NotFound { id: id.clone() })
    }

    fn create(
        &mut self,
        name: &str,
        bytes: &[u8],
        parent: Option<&RemoteId>,
    ) -> Result<(RemoteId, VersionToken), RemoteError> {
        let id = RemoteId::new(Uuid::now_v7().to_string());
        let token = new_token(1);
        let checksum = blake3::hash(bytes);
        self.conn.execute(
            "INSERT INTO objects (object_id, name, parent_id, is_container, content, checksum, version, generation, modified_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, 1, ?7)",
            rusqlite::params![
                id.as_str(),
                name,
                parent.map(RemoteId::as_str),
                bytes,
                checksum.as_bytes().as_slice(),
                token.as_str(),
                now(),
            ],
        )?;
        debug!(%id, name, bytes = bytes.len(), "created blob");
        Ok((id, token))
    }

    fn update(
        &mut self,
        id: &RemoteId,
        bytes: &[u8],
        expected: &VersionToken,
    ) -> Result<VersionToken, RemoteError> {
        require_id(id)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(String, i64, bool)> = tx
            .query_row(
                "SELECT version, generation, writable FROM objects WHERE object_id = ?1 AND is_container = 0",
                rusqlite::params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((version, generation, writable)) = current else {
            return Err(RemoteError::NotFound { id: id.clone() });
        };
        if !writable {
            return Err(RemoteError::PermissionDenied { id: id.clone() });
        }
        if version != expected.as_str() {
            return Err(RemoteError::StaleFile {
                id: id.clone(),
                expected: expected.clone(),
                current: VersionToken::new(version),
            });
        }

        let token = new_token(generation + 1);
        let checksum = blake3::hash(bytes);
        tx.execute(
            "UPDATE objects SET content = ?1, checksum = ?2, version = ?3, generation = ?4, modified_at = ?5
             WHERE object_id = ?6",
            rusqlite::params![
                bytes,
                checksum.as_bytes().as_slice(),
                token.as_str(),
                generation + 1,
                now(),
                id.as_str(),
            ],
        )?;
        tx.commit()?;
        debug!(%id, bytes = bytes.len(), "updated blob");
        Ok(token)
    }

    fn create_container(
        &mut self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        let id = RemoteId::new(Uuid::now_v7().to_string());
        self.conn.execute(
            "INSERT INTO objects (object_id, name, parent_id, is_container, version, modified_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)",
            rusqlite::params![id.as_str(), name, parent.map(RemoteId::as_str), new_token(1).as_str(), now()],
        )?;
        debug!(%id, name, "created container");
        Ok(id)
    }

    fn list_children(
        &self,
        container: &RemoteId,
        pattern: &Regex,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        require_id(container)?;
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM objects WHERE object_id = ?1 AND is_container = 1",
                rusqlite::params![container.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RemoteError::NotFound {
                id: container.clone(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT object_id, name, is_container FROM objects WHERE parent_id = ?1 ORDER BY name, object_id",
        )?;
        let rows = stmt.query_map(rusqlite::params![container.as_str()], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let is_container: bool = row.get(2)?;
            Ok((id, name, is_container))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, name, is_container) = row?;
            if pattern.is_match(&name) {
                entries.push(RemoteEntry {
                    id: RemoteId::new(id),
                    name,
                    is_container,
                });
            }
        }
        Ok(entries)
    }
}

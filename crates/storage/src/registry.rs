//! Logical file name -> remote id, persisted as a small JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::traits::RemoteId;

pub const GRID_DEWAR_KEY: &str = "Grid_Dewar_Inventory";
pub const FREEZER80_KEY: &str = "80_Inventory";
pub const FREEZER20_KEY: &str = "20_Inventory";
pub const CELL_ROWS_KEY: &str = "Cell_Culture_Inventory_Rows";
pub const CELL_GRID_KEY: &str = "Cell_Culture_Inventory_Grid";
pub const ARCHIVE_ROOT_KEY: &str = "Inventories_Folder";

/// Keys written to a fresh registry file, all with empty ids.
pub const DEFAULT_KEYS: [&str; 6] = [
    GRID_DEWAR_KEY,
    FREEZER80_KEY,
    FREEZER20_KEY,
    CELL_ROWS_KEY,
    CELL_GRID_KEY,
    ARCHIVE_ROOT_KEY,
];

#[derive(Debug)]
pub struct IdRegistry {
    path: PathBuf,
    ids: BTreeMap<String, String>,
}

impl IdRegistry {
    /// Load the registry at `path`, writing a default one if it is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let registry = Self {
                path,
                ids: DEFAULT_KEYS
                    .iter()
                    .map(|k| (k.to_string(), String::new()))
                    .collect(),
            };
            registry.save()?;
            info!(path = %registry.path.display(), "created identifier registry");
            return Ok(registry);
        }

        let raw: BTreeMap<String, Value> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let mut ids = BTreeMap::new();
        for (key, value) in raw {
            match value {
                Value::String(id) => {
                    ids.insert(key, id);
                }
                Value::Null => {
                    ids.insert(key, String::new());
                }
                other => warn!(%key, value = %other, "skipping non-string registry entry"),
            }
        }
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The id registered under `key`; unset and blank ids read as `None`.
    pub fn get(&self, key: &str) -> Option<RemoteId> {
        self.ids
            .get(key)
            .map(RemoteId::new)
            .filter(|id| !id.is_empty())
    }

    /// Point update, persisted before returning.
    pub fn update(&mut self, key: &str, id: &RemoteId) -> Result<(), StorageError> {
        self.ids.insert(key.to_string(), id.as_str().to_string());
        self.save()?;
        info!(key, %id, "registry updated");
        Ok(())
    }

    /// Every registered key with its id (possibly empty), sorted by key.
    pub fn all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.ids)?)?;
        Ok(())
    }
}

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use labinv_core::{InventorySchema, RawTable};
use labinv_engine::{EngineError, InventorySession, Services};
use labinv_storage::registry::ARCHIVE_ROOT_KEY;
use labinv_storage::{
    IdRegistry, RemoteId, RemoteStore, ScratchFiles, SqliteBlobStore, StorageError, workbook,
};
use tempfile::TempDir;

/// One running copy of the application: its own registry file and scratch
/// directory, talking to an in-memory or file-backed blob store.
pub struct TestInstance {
    pub dir: TempDir,
    pub services: Services<SqliteBlobStore>,
}

impl TestInstance {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_store(SqliteBlobStore::open_in_memory()?)
    }

    /// Share the blob store at `path` with other instances.
    pub fn with_store_file(path: &Path) -> Result<Self, StorageError> {
        Self::with_store(SqliteBlobStore::open(&path.to_string_lossy())?)
    }

    fn with_store(store: SqliteBlobStore) -> Result<Self, StorageError> {
        let dir = tempfile::tempdir()?;
        let registry = IdRegistry::load(dir.path().join("drive_ids.json"))?;
        let scratch = ScratchFiles::new(dir.path().join("scratch"))?
            .with_retry(2, Duration::from_millis(1));
        Ok(Self {
            dir,
            services: Services::new(store, registry, scratch),
        })
    }

    /// Upload `table` as the sheet of `schema` and register the new id.
    pub fn seed(&mut self, schema: &InventorySchema, table: &RawTable) -> Result<RemoteId, Box<dyn Error>> {
        let path = self.dir.path().join(format!("seed_{}.xlsx", schema.registry_key));
        workbook::write_replacing_sheet(&path, &schema.sheet_name, table)?;
        let bytes = std::fs::read(&path)?;
        let (id, _) = self
            .services
            .store
            .create(&format!("{}.xlsx", schema.registry_key), &bytes, None)?;
        self.services.registry.update(&schema.registry_key, &id)?;
        Ok(id)
    }

    /// Create and register the container archives go under.
    pub fn create_archive_root(&mut self) -> Result<RemoteId, Box<dyn Error>> {
        let id = self.services.store.create_container("Inventories", None)?;
        self.services.registry.update(ARCHIVE_ROOT_KEY, &id)?;
        Ok(id)
    }

    pub fn open(&mut self, schema: InventorySchema) -> Result<InventorySession<'_, SqliteBlobStore>, EngineError> {
        InventorySession::open(&mut self.services, schema)
    }

    pub fn remote_id(&self, schema: &InventorySchema) -> Option<RemoteId> {
        self.services.registry.get(&schema.registry_key)
    }

    /// What the remote store currently holds for `schema`, as a raw sheet.
    pub fn remote_table(&self, schema: &InventorySchema) -> Result<RawTable, Box<dyn Error>> {
        let id = self.remote_id(schema).ok_or("inventory not registered")?;
        let blob = self.services.store.get(&id)?;
        let path = self.dir.path().join(format!("check_{}.xlsx", schema.registry_key));
        std::fs::write(&path, &blob.bytes)?;
        Ok(workbook::read_sheet(&path, &schema.sheet_name)?)
    }

    /// Raw bytes of the remote copy of `schema`.
    pub fn remote_bytes(&self, schema: &InventorySchema) -> Result<Vec<u8>, Box<dyn Error>> {
        let id = self.remote_id(schema).ok_or("inventory not registered")?;
        Ok(self.services.store.get(&id)?.bytes)
    }
}

use std::error::Error;
use std::path::PathBuf;

use labinv_storage::RemoteId;
use tempfile::TempDir;

use crate::TestInstance;

/// Several application instances sharing one blob store file, the way two
/// lab members share the same cloud files.
pub struct TestNetwork {
    dir: TempDir,
    instances: Vec<TestInstance>,
}

impl TestNetwork {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            instances: Vec::new(),
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store.sqlite3")
    }

    /// Add an instance. It starts with the registry of the first instance,
    /// if there is one.
    pub fn add_instance(&mut self) -> Result<usize, Box<dyn Error>> {
        let mut instance = TestInstance::with_store_file(&self.store_path())?;
        if let Some(first) = self.instances.first() {
            let ids: Vec<(String, String)> = first
                .services
                .registry
                .all()
                .filter(|(_, id)| !id.is_empty())
                .map(|(k, id)| (k.to_string(), id.to_string()))
                .collect();
            for (key, id) in ids {
                instance.services.registry.update(&key, &RemoteId::new(id))?;
            }
        }
        let index = self.instances.len();
        self.instances.push(instance);
        Ok(index)
    }

    pub fn instance(&self, index: usize) -> &TestInstance {
        &self.instances[index]
    }

    pub fn instance_mut(&mut self, index: usize) -> &mut TestInstance {
        &mut self.instances[index]
    }

    /// Two distinct instances at once.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut TestInstance, &mut TestInstance) {
        assert_ne!(a, b, "pair_mut needs two different instances");
        if a < b {
            let (left, right) = self.instances.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.instances.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }
}

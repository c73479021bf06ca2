pub mod archive;
pub mod config;
pub mod conflict;
pub mod error;
pub mod sync;

pub use archive::ArchiveOutcome;
pub use config::AppConfig;
pub use conflict::RemovalPlan;
pub use error::{ConflictError, EngineError};
pub use sync::{SyncCoordinator, SyncState, UploadOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use labinv_core::{
    Constraint, Intent, InventorySchema, RecordSet, Submission,
    normalize, occupancy, picker::PickerView, suggest, validate,
};
use labinv_storage::registry::ARCHIVE_ROOT_KEY;
use labinv_storage::{IdRegistry, RemoteId, RemoteStore, ScratchFiles, workbook};
use tracing::{info, warn};

/// Process-wide collaborators, built once at startup and lent to sessions.
pub struct Services<S: RemoteStore> {
    pub store: S,
    pub registry: IdRegistry,
    pub scratch: ScratchFiles,
}

impl<S: RemoteStore> Services<S> {
    pub fn new(store: S, registry: IdRegistry, scratch: ScratchFiles) -> Self {
        Self {
            store,
            registry,
            scratch,
        }
    }

    /// Point the registry entry `key` at a different remote id.
    pub fn replace_identifier(&mut self, key: &str, id: &RemoteId) -> Result<(), EngineError> {
        if id.is_empty() {
            return Err(labinv_storage::RemoteError::MissingId.into());
        }
        self.registry.update(key, id)?;
        Ok(())
    }

    pub fn auto_archive(&mut self, today: NaiveDate) -> Result<ArchiveOutcome, EngineError> {
        archive::auto_archive(&mut self.store, &self.registry, today)
    }

    /// Take this half-year's archive if an archive root is registered and
    /// none exists yet. A failure is logged and otherwise ignored.
    pub fn archive_if_due(&mut self, today: NaiveDate) -> Option<ArchiveOutcome> {
        self.registry.get(ARCHIVE_ROOT_KEY)?;
        match self.auto_archive(today) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "automatic archive failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub locations: Vec<String>,
    pub upload: UploadOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: usize,
    pub locations: Vec<String>,
    pub upload: UploadOutcome,
}

#[derive(Debug)]
struct PendingRemoval {
    plan: RemovalPlan,
    generation: u64,
}

/// One open inventory: its canonical records, the local copy they came
/// from, and the remote file they go back to.
///
/// Every accepted mutation bumps `generation`, is written to the local copy
/// and uploaded before the call returns.
pub struct InventorySession<'a, S: RemoteStore> {
    services: &'a mut Services<S>,
    schema: InventorySchema,
    records: RecordSet,
    local_path: PathBuf,
    sync: SyncCoordinator,
    generation: u64,
    pending: Option<PendingRemoval>,
}

impl<'a, S: RemoteStore> InventorySession<'a, S> {
    /// Download the registered file for `schema` and load its sheet, taking
    /// the half-yearly archive first when one is due.
    pub fn open(services: &'a mut Services<S>, schema: InventorySchema) -> Result<Self, EngineError> {
        services.archive_if_due(Local::now().date_naive());

        let file_name = format!("{}.xlsx", schema.registry_key);
        let local_path = services.scratch.path_for(&file_name);
        let remote_id = services.registry.get(&schema.registry_key);

        let mut sync = SyncCoordinator::new(&file_name);
        sync.download(&services.store, remote_id.as_ref(), &local_path)?;
        let records = load_records(&local_path, &schema)?;
        info!(inventory = %schema.title, records = records.len(), "inventory opened");

        Ok(Self {
            services,
            schema,
            records,
            local_path,
            sync,
            generation: 0,
            pending: None,
        })
    }

    /// Start from a workbook on disk that has no remote copy. The first
    /// accepted mutation, or [`publish`](Self::publish), creates the remote
    /// file and registers its id.
    pub fn import(
        services: &'a mut Services<S>,
        schema: InventorySchema,
        source: &Path,
    ) -> Result<Self, EngineError> {
        let file_name = format!("{}.xlsx", schema.registry_key);
        let local_path = services.scratch.path_for(&file_name);
        if source != local_path.as_path() {
            std::fs::copy(source, &local_path).map_err(|e| EngineError::Storage(e.into()))?;
        }

        let mut sync = SyncCoordinator::new(&file_name);
        sync.adopt_local();
        let records = load_records(&local_path, &schema)?;
        info!(inventory = %schema.title, records = records.len(), "inventory imported");

        Ok(Self {
            services,
            schema,
            records,
            local_path,
            sync,
            generation: 0,
            pending: None,
        })
    }

    pub fn schema(&self) -> &InventorySchema {
        &self.schema
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.sync.remote_id()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Occupied locations of the container named by `constraints`.
    pub fn occupied(&self, constraints: &[Constraint]) -> BTreeSet<String> {
        occupancy::occupied_locations(&self.records, &self.schema, constraints)
    }

    pub fn picker(&self, entries: &Submission, intent: Intent) -> Result<PickerView, EngineError> {
        Ok(PickerView::open(&self.records, &self.schema, entries, intent)?)
    }

    /// Dropdown options for every visible column, narrowed by `entries`.
    pub fn suggestions(&self, entries: &Submission) -> BTreeMap<String, Vec<String>> {
        let fields: Vec<String> = self
            .records
            .columns()
            .iter()
            .filter(|c| !self.schema.hidden_fields.contains(*c))
            .cloned()
            .collect();
        suggest::filtered_options(&self.records, &fields, entries)
    }

    /// Validate, check for occupied slots, then append, re-sort, save and
    /// upload. Nothing changes when any step before the save fails.
    pub fn submit_add(&mut self, submission: &Submission) -> Result<AddOutcome, EngineError> {
        self.ensure_writable()?;
        let cleaned = validate::validate(submission, &self.schema, Intent::Add)?;
        let candidates = conflict::propose_add(&self.records, &cleaned, &self.schema)?;
        let locations: Vec<String> = candidates
            .iter()
            .map(|r| r.key(&self.schema.location_field))
            .collect();

        if self.records.columns().is_empty() {
            let columns = conflict::candidate_columns(&self.records, &cleaned, &self.schema);
            self.records = RecordSet::new(columns);
        }
        self.records.append(candidates);
        self.records.sort_by_fields(&self.schema.sort_fields);
        self.generation += 1;
        info!(inventory = %self.schema.title, locations = %locations.join(", "), "added");

        let upload = self.persist()?;
        Ok(AddOutcome { locations, upload })
    }

    /// Validate and match a removal, keeping the plan until it is confirmed.
    /// The returned plan's [`preview`](RemovalPlan::preview) is what the
    /// user should see.
    pub fn submit_remove(&mut self, submission: &Submission) -> Result<RemovalPlan, EngineError> {
        self.ensure_writable()?;
        let cleaned = validate::validate(submission, &self.schema, Intent::Remove)?;
        let plan = conflict::propose_remove(&self.records, &cleaned, &self.schema)?;
        self.pending = Some(PendingRemoval {
            plan: plan.clone(),
            generation: self.generation,
        });
        Ok(plan)
    }

    /// Apply the plan from the last [`submit_remove`](Self::submit_remove),
    /// provided nothing was mutated since.
    pub fn confirm_remove(&mut self) -> Result<RemoveOutcome, EngineError> {
        self.ensure_writable()?;
        let pending = self.pending.take().ok_or(EngineError::NoPendingRemoval)?;
        if pending.generation != self.generation {
            return Err(EngineError::StalePlan);
        }

        let removed = self.records.remove_indices(&pending.plan.indices).len();
        self.records.sort_by_fields(&self.schema.sort_fields);
        self.generation += 1;
        info!(
            inventory = %self.schema.title,
            locations = %pending.plan.locations.join(", "),
            removed,
            "removed"
        );

        let upload = self.persist()?;
        Ok(RemoveOutcome {
            removed,
            locations: pending.plan.locations,
            upload,
        })
    }

    pub fn cancel_remove(&mut self) {
        self.pending = None;
    }

    /// Upload the current local copy as is.
    pub fn publish(&mut self) -> Result<UploadOutcome, EngineError> {
        self.ensure_writable()?;
        self.persist()
    }

    fn ensure_writable(&self) -> Result<(), EngineError> {
        if self.sync.state() == SyncState::Stale {
            Err(EngineError::SessionStale)
        } else {
            Ok(())
        }
    }

    fn persist(&mut self) -> Result<UploadOutcome, EngineError> {
        workbook::write_replacing_sheet(&self.local_path, &self.schema.sheet_name, &self.records.to_table())?;
        let parent = self.services.registry.get(ARCHIVE_ROOT_KEY);
        let outcome = self
            .sync
            .upload(&mut self.services.store, &self.local_path, parent.as_ref())?;
        if let UploadOutcome::Created { id, .. } = &outcome {
            self.services.registry.update(&self.schema.registry_key, id)?;
        }
        Ok(outcome)
    }
}

/// Read, clean and sort one inventory sheet, flagging legacy duplicates.
pub fn load_records(path: &Path, schema: &InventorySchema) -> Result<RecordSet, EngineError> {
    let raw = workbook::read_sheet(path, &schema.sheet_name)?;
    let mut records = normalize::clean(&raw, schema);
    records.sort_by_fields(&schema.sort_fields);
    for slot in records.duplicate_slots(schema) {
        warn!(
            inventory = %schema.title,
            slot = %slot.join(" / "),
            "several records share one slot"
        );
    }
    Ok(records)
}

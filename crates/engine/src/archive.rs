//! Half-yearly snapshot of every registered inventory file.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use labinv_storage::registry::ARCHIVE_ROOT_KEY;
use labinv_storage::{IdRegistry, RemoteError, RemoteId, RemoteStore};
use regex::Regex;
use tracing::{info, warn};

use crate::error::EngineError;

static ARCHIVE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}_\d{2}_\d{4})$").expect("static regex"));

const STAMP_FORMAT: &str = "%m_%d_%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// An archive for this year and half already exists.
    AlreadyArchived { name: String },
    Created {
        container: RemoteId,
        name: String,
        copied: Vec<(String, RemoteId)>,
        skipped: Vec<String>,
    },
}

/// 1 for January through June, 2 otherwise.
pub fn half_of_year(date: NaiveDate) -> u8 {
    if date.month() <= 6 { 1 } else { 2 }
}

pub fn archive_name(date: NaiveDate) -> String {
    format!("Archive_{}", date.format(STAMP_FORMAT))
}

/// Date stamped at the end of an archive container's name.
pub fn archive_date(name: &str) -> Option<NaiveDate> {
    let caps = ARCHIVE_NAME.captures(name)?;
    NaiveDate::parse_from_str(&caps[1], STAMP_FORMAT).ok()
}

/// Create the archive for `today`'s half-year unless one exists.
pub fn auto_archive<S: RemoteStore>(
    store: &mut S,
    registry: &IdRegistry,
    today: NaiveDate,
) -> Result<ArchiveOutcome, EngineError> {
    let root = registry.get(ARCHIVE_ROOT_KEY).ok_or(RemoteError::MissingId)?;

    let existing = store.list_children(&root, &ARCHIVE_NAME)?;
    if let Some(entry) = existing.iter().filter(|e| e.is_container).find(|e| {
        archive_date(&e.name)
            .is_some_and(|d| d.year() == today.year() && half_of_year(d) == half_of_year(today))
    }) {
        info!(name = %entry.name, "archive for this half-year already exists");
        return Ok(ArchiveOutcome::AlreadyArchived {
            name: entry.name.clone(),
        });
    }

    make_archive(store, registry, &root, today)
}

/// Copy every registered file into a new `Archive_MM_DD_YYYY` container.
/// Unset ids are skipped; files that cannot be read are skipped with a
/// warning.
pub fn make_archive<S: RemoteStore>(
    store: &mut S,
    registry: &IdRegistry,
    root: &RemoteId,
    today: NaiveDate,
) -> Result<ArchiveOutcome, EngineError> {
    let name = archive_name(today);
    let container = store.create_container(&name, Some(root))?;
    let stamp = today.format(STAMP_FORMAT).to_string();

    let mut copied = Vec::new();
    let mut skipped = Vec::new();
    for (key, id) in registry.all() {
        if key == ARCHIVE_ROOT_KEY {
            continue;
        }
        let id = RemoteId::new(id);
        if id.is_empty() {
            skipped.push(key.to_string());
            continue;
        }
        let blob = match store.get(&id) {
            Ok(blob) => blob,
            Err(e @ (RemoteError::NotFound { .. } | RemoteError::PermissionDenied { .. })) => {
                warn!(key, error = %e, "not archived");
                skipped.push(key.to_string());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let (copy, _) = store.create(&format!("{key}_{stamp}.xlsx"), &blob.bytes, Some(&container))?;
        copied.push((key.to_string(), copy));
    }

    info!(%name, copied = copied.len(), skipped = skipped.len(), "archive created");
    Ok(ArchiveOutcome::Created {
        container,
        name,
        copied,
        skipped,
    })
}

//! Acceptance of add/remove batches against the current record set.
//!
//! Both directions are all-or-nothing: one bad location rejects the whole
//! batch, and every bad location is listed. Keys compare as trimmed display
//! text here, not numerically.

use labinv_core::{
    CleanedEntries, FieldValue, InventorySchema, MISSING_INTEGER, Record, RecordSet,
};
use tracing::debug;

use crate::error::ConflictError;

pub const PREVIEW_LIMIT: usize = 8;

/// Matched rows of an accepted removal, plus what to show before applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPlan {
    /// Record indices to drop, in match order, without repeats.
    pub indices: Vec<usize>,
    pub locations: Vec<String>,
    /// One `field: value` block per requested location.
    pub entries: Vec<String>,
}

impl RemovalPlan {
    /// First [`PREVIEW_LIMIT`] entries, then a count of the rest.
    pub fn preview(&self) -> String {
        let mut summary = self
            .entries
            .iter()
            .take(PREVIEW_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n");
        if self.entries.len() > PREVIEW_LIMIT {
            summary.push_str(&format!(
                "\n\n...and {} more items.",
                self.entries.len() - PREVIEW_LIMIT
            ));
        }
        summary
    }
}

fn locations(cleaned: &CleanedEntries, schema: &InventorySchema) -> Result<Vec<FieldValue>, ConflictError> {
    let mut seen: Vec<String> = Vec::new();
    let mut unique = Vec::new();
    for location in &cleaned.locations {
        let key = location.key();
        if !seen.contains(&key) {
            seen.push(key);
            unique.push(location.clone());
        }
    }
    if unique.is_empty() {
        return Err(ConflictError::NoLocations {
            field: schema.location_field.clone(),
        });
    }
    Ok(unique)
}

fn blank_for(field: &str, schema: &InventorySchema) -> FieldValue {
    if schema.is_integer_field(field) {
        FieldValue::Integer(MISSING_INTEGER)
    } else {
        FieldValue::Text(String::new())
    }
}

/// Columns a new record carries: the sheet header, or for a sheet without
/// one, the spatial key followed by the submitted fields.
pub fn candidate_columns(records: &RecordSet, cleaned: &CleanedEntries, schema: &InventorySchema) -> Vec<String> {
    if !records.columns().is_empty() {
        return records.columns().to_vec();
    }
    let mut columns: Vec<String> = schema
        .spatial_key_fields()
        .into_iter()
        .map(str::to_string)
        .collect();
    for field in cleaned.fields.keys() {
        if !columns.contains(field) {
            columns.push(field.clone());
        }
    }
    columns
}

/// One candidate per requested location, or every occupied location.
pub fn propose_add(
    records: &RecordSet,
    cleaned: &CleanedEntries,
    schema: &InventorySchema,
) -> Result<Vec<Record>, ConflictError> {
    let columns = candidate_columns(records, cleaned, schema);
    let candidates: Vec<Record> = locations(cleaned, schema)?
        .into_iter()
        .map(|location| {
            let mut record = Record::new();
            for column in &columns {
                let value = if schema.is_location_field(column) {
                    location.clone()
                } else {
                    cleaned
                        .get(column)
                        .cloned()
                        .unwrap_or_else(|| blank_for(column, schema))
                };
                record.set(column, value);
            }
            record
        })
        .collect();

    let key_fields = schema.spatial_key_fields();
    let occupied: Vec<String> = candidates
        .iter()
        .filter(|candidate| {
            records
                .records()
                .iter()
                .any(|existing| key_fields.iter().all(|f| existing.key(f) == candidate.key(f)))
        })
        .map(|candidate| candidate.key(&schema.location_field))
        .collect();

    if !occupied.is_empty() {
        return Err(ConflictError::Occupied {
            field: schema.location_field.clone(),
            locations: occupied,
        });
    }
    debug!(count = candidates.len(), "add batch accepted");
    Ok(candidates)
}

/// Rows matching every removal key at each requested location.
pub fn propose_remove(
    records: &RecordSet,
    cleaned: &CleanedEntries,
    schema: &InventorySchema,
) -> Result<RemovalPlan, ConflictError> {
    let requested = locations(cleaned, schema)?;

    let mut wanted: Vec<(&str, String)> = Vec::with_capacity(schema.removal_key_fields.len());
    for field in &schema.removal_key_fields {
        if schema.is_location_field(field) {
            continue;
        }
        let value = cleaned
            .get(field)
            .map(FieldValue::key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConflictError::IncompleteKey { field: field.clone() })?;
        wanted.push((field.as_str(), value));
    }

    let mut plan = RemovalPlan {
        indices: Vec::new(),
        locations: Vec::new(),
        entries: Vec::new(),
    };
    let mut missing = Vec::new();
    let location_field = schema.location_field.as_str();
    let matches_location = schema.removal_key_fields.iter().any(|f| f == location_field);

    for location in requested {
        let location = location.key();
        let matched: Vec<usize> = records
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| wanted.iter().all(|(f, v)| r.key(f) == *v))
            .filter(|(_, r)| !matches_location || r.key(location_field) == location)
            .map(|(i, _)| i)
            .collect();

        let Some(first) = matched.first().and_then(|i| records.get(*i)) else {
            missing.push(location);
            continue;
        };

        plan.entries.push(preview_entry(first, records, schema));
        plan.locations.push(location);
        for index in matched {
            if !plan.indices.contains(&index) {
                plan.indices.push(index);
            }
        }
    }

    if !missing.is_empty() {
        return Err(ConflictError::Missing {
            field: schema.location_field.clone(),
            locations: missing,
        });
    }
    debug!(rows = plan.indices.len(), "remove batch accepted");
    Ok(plan)
}

fn preview_entry(record: &Record, records: &RecordSet, schema: &InventorySchema) -> String {
    schema
        .removal_key_fields
        .iter()
        .chain(std::iter::once(&schema.label_field))
        .filter(|f| records.has_column(f))
        .map(|f| format!("{f}: {}", record.key(f)))
        .collect::<Vec<_>>()
        .join("\n")
}

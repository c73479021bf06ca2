//! Which slots of a container are taken.

use std::collections::BTreeSet;

use tracing::warn;

use crate::field_value::{FieldValue, MISSING_INTEGER, parse_whole_number};
use crate::record::{Record, RecordSet};
use crate::schema::InventorySchema;

/// One `field = value` filter identifying (part of) a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub field: String,
    pub value: String,
}

impl Constraint {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Numeric when the wanted value reads as a whole number (cells that do
    /// not count as the sentinel), trimmed text equality otherwise.
    pub fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.field).unwrap_or(&FieldValue::Null);
        match parse_whole_number(&self.value) {
            Some(wanted) => cell.to_whole_number().unwrap_or(MISSING_INTEGER) == wanted,
            None => cell.key() == self.value.trim(),
        }
    }
}

/// Build constraints from `(field, value)` pairs.
pub fn constraints(pairs: &[(&str, &str)]) -> Vec<Constraint> {
    pairs.iter().map(|(f, v)| Constraint::new(f, v)).collect()
}

/// Keep only the constraints whose field exists in `records`; the rest are
/// logged and dropped.
pub fn applicable<'a>(records: &RecordSet, constraints: &'a [Constraint]) -> Vec<&'a Constraint> {
    constraints
        .iter()
        .filter(|c| {
            let known = records.has_column(&c.field);
            if !known {
                warn!(field = %c.field, "occupancy constraint references unknown column; ignoring it");
            }
            known
        })
        .collect()
}

/// Indices of records matching every applicable constraint.
pub fn matching_indices(records: &RecordSet, constraints: &[Constraint]) -> Vec<usize> {
    let active = applicable(records, constraints);
    records
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| active.iter().all(|c| c.matches(r)))
        .map(|(i, _)| i)
        .collect()
}

/// Distinct location codes (trimmed, uppercased) of the records matching
/// `constraints`. Blank locations and the integer sentinel are not slots.
pub fn occupied_locations(
    records: &RecordSet,
    schema: &InventorySchema,
    constraints: &[Constraint],
) -> BTreeSet<String> {
    let location = schema.location_field.as_str();
    matching_indices(records, constraints)
        .into_iter()
        .filter_map(|i| records.get(i))
        .filter(|r| r.get(location).and_then(FieldValue::as_integer) != Some(MISSING_INTEGER))
        .map(|r| r.key(location).to_uppercase())
        .filter(|code| !code.is_empty())
        .collect()
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::schema::InventorySchema;
use crate::table::RawTable;

/// One canonical inventory row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value.into());
        self
    }

    /// Trimmed display text of `field`; absent fields read as empty.
    pub fn key(&self, field: &str) -> String {
        self.fields.get(field).map(FieldValue::key).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

/// The in-memory table of every record of one inventory.
///
/// Column order follows the source sheet header. No two records should share
/// the same spatial key (occupancy keys + location); accepted adds keep it
/// that way, legacy sheets may not (see [`RecordSet::duplicate_slots`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn from_records(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, records: Vec<Record>) {
        self.records.extend(records);
    }

    /// Drop the records at `indices` (duplicates ignored) and return them in
    /// their original order.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<Record> {
        let doomed: BTreeSet<usize> = indices.iter().copied().collect();
        let mut removed = Vec::with_capacity(doomed.len());
        let mut kept = Vec::with_capacity(self.records.len().saturating_sub(doomed.len()));
        for (i, record) in std::mem::take(&mut self.records).into_iter().enumerate() {
            if doomed.contains(&i) {
                removed.push(record);
            } else {
                kept.push(record);
            }
        }
        self.records = kept;
        removed
    }

    /// Stable sort by the given fields, in order. Fields missing from the
    /// header are skipped.
    pub fn sort_by_fields(&mut self, fields: &[String]) {
        let fields: Vec<&String> = fields.iter().filter(|f| self.has_column(f)).collect();
        if fields.is_empty() {
            return;
        }
        self.records.sort_by(|a, b| {
            fields
                .iter()
                .map(|f| compare_values(a.get(f), b.get(f)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Spatial keys held by more than one record.
    pub fn duplicate_slots(&self, schema: &InventorySchema) -> Vec<Vec<String>> {
        let key_fields = schema.spatial_key_fields();
        let mut seen: BTreeMap<Vec<String>, usize> = BTreeMap::new();
        for record in &self.records {
            let key: Vec<String> = key_fields.iter().map(|f| record.key(f)).collect();
            *seen.entry(key).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect()
    }

    /// Back to a sheet-shaped table, columns in header order.
    pub fn to_table(&self) -> RawTable {
        let mut table = RawTable::new(self.columns.clone());
        for record in &self.records {
            table.push_row(
                self.columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(FieldValue::Null))
                    .collect(),
            );
        }
        table
    }
}

fn rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Integer(_) | FieldValue::Float(_) => 0,
        FieldValue::Boolean(_) => 1,
        FieldValue::Timestamp(_) => 2,
        FieldValue::Text(_) => 3,
        FieldValue::Null => 4,
    }
}

/// Numbers numerically, text lexically, nulls last.
pub fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let null = FieldValue::Null;
    let a = a.unwrap_or(&null);
    let b = b.unwrap_or(&null);
    match (a, b) {
        (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
        (FieldValue::Integer(x), FieldValue::Float(y)) => (*x as f64).total_cmp(y),
        (FieldValue::Float(x), FieldValue::Integer(y)) => x.total_cmp(&(*y as f64)),
        (FieldValue::Float(x), FieldValue::Float(y)) => x.total_cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

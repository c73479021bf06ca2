//! Dropdown suggestions for the entry form.

use std::collections::{BTreeMap, BTreeSet};

use crate::field_value::{FieldValue, MISSING_INTEGER};
use crate::record::RecordSet;
use crate::validate::Submission;

fn display(value: &FieldValue) -> Option<String> {
    if value.as_integer() == Some(MISSING_INTEGER) {
        return None;
    }
    let text = value.key();
    (!text.is_empty()).then_some(text)
}

fn sorted_options(values: BTreeSet<String>) -> Vec<String> {
    let mut options: Vec<String> = std::iter::once(String::new()).chain(values).collect();
    options.sort_by_key(|v| v.to_lowercase());
    options
}

/// Every distinct value of `field`, case-insensitively sorted, led by an
/// empty option. Unknown columns yield no options.
pub fn column_options(records: &RecordSet, field: &str) -> Vec<String> {
    if !records.has_column(field) {
        return Vec::new();
    }
    let values = records
        .records()
        .iter()
        .filter_map(|r| r.get(field).and_then(display))
        .collect();
    sorted_options(values)
}

/// Options for each of `fields`, narrowed to the records agreeing with every
/// non-empty entry already typed. When nothing agrees, all options come back.
pub fn filtered_options(
    records: &RecordSet,
    fields: &[String],
    entries: &Submission,
) -> BTreeMap<String, Vec<String>> {
    let filters: Vec<(&str, String)> = entries
        .entries()
        .filter(|(field, _)| records.has_column(field))
        .map(|(field, value)| (field, value.trim().to_string()))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    let matching: Vec<_> = records
        .records()
        .iter()
        .filter(|r| filters.iter().all(|(f, v)| r.key(f) == *v))
        .collect();

    fields
        .iter()
        .filter(|f| records.has_column(f))
        .map(|field| {
            let options = if matching.is_empty() {
                column_options(records, field)
            } else {
                sorted_options(
                    matching
                        .iter()
                        .filter_map(|r| r.get(field).and_then(display))
                        .collect(),
                )
            };
            (field.clone(), options)
        })
        .collect()
}

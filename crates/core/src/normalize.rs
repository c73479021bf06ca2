//! Bulk cleaning of spreadsheet rows into canonical records.
//!
//! Permissive on purpose: the source sheets carry legacy and half-filled
//! rows, so bad cells degrade to the integer sentinel or to empty text and
//! never fail the load.

use std::sync::LazyLock;

use regex::Regex;

use crate::dates::canonical_date;
use crate::field_value::{FieldValue, MISSING_INTEGER};
use crate::record::{Record, RecordSet};
use crate::schema::InventorySchema;
use crate::table::RawTable;

static LETTER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]\d+$").expect("static regex"));

/// `true` for one ASCII letter followed by one or more digits (`A12`).
pub fn is_letter_number(value: &str) -> bool {
    LETTER_NUMBER.is_match(value)
}

/// Clean every row of `raw` into a canonical record set. Pure: `raw` is not
/// touched and the header order is kept (names trimmed).
pub fn clean(raw: &RawTable, schema: &InventorySchema) -> RecordSet {
    let columns: Vec<String> = raw.columns.iter().map(|c| c.trim().to_string()).collect();
    let records = raw
        .rows
        .iter()
        .map(|row| {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                let cell = row.get(i).unwrap_or(&FieldValue::Null);
                record.set(column, clean_cell(cell, column, schema));
            }
            record
        })
        .collect();
    RecordSet::from_records(columns, records)
}

/// Canonical value of one cell under the role `field` plays in `schema`.
pub fn clean_cell(cell: &FieldValue, field: &str, schema: &InventorySchema) -> FieldValue {
    if schema.is_integer_field(field) {
        return FieldValue::Integer(cell.to_whole_number().unwrap_or(MISSING_INTEGER));
    }
    if schema.is_letter_number_field(field) {
        let text = cell.display().trim().to_uppercase();
        return if is_letter_number(&text) {
            FieldValue::Text(text)
        } else {
            FieldValue::Text(String::new())
        };
    }
    if schema.is_date_field(field) {
        return FieldValue::Text(canonical_date(cell).unwrap_or_default());
    }
    let text = cell.display().trim().to_string();
    if text == "nan" {
        FieldValue::Text(String::new())
    } else {
        FieldValue::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::midnight;
    use chrono::NaiveDate;

    fn schema() -> InventorySchema {
        InventorySchema::new("t", "Vial Position")
            .with_integer_fields(&["Shelf Number"])
            .with_letter_number_fields(&["Vial Position"])
            .with_date_field("Date Frozen")
    }

    fn table() -> RawTable {
        RawTable {
            columns: vec![
                " Shelf Number ".into(),
                "Vial Position".into(),
                "Date Frozen".into(),
                "Notes".into(),
            ],
            rows: vec![
                vec![
                    FieldValue::Float(2.0),
                    FieldValue::Text(" b7 ".into()),
                    FieldValue::Timestamp(midnight(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())),
                    FieldValue::Text("  thawed once ".into()),
                ],
                vec![
                    FieldValue::Text("two".into()),
                    FieldValue::Text("7B".into()),
                    FieldValue::Text("13/40/2024".into()),
                    FieldValue::Text("nan".into()),
                ],
                vec![FieldValue::Null],
            ],
        }
    }

    #[test]
    fn typed_columns_are_normalized() {
        let set = clean(&table(), &schema());
        assert_eq!(set.columns()[0], "Shelf Number");

        let first = &set.records()[0];
        assert_eq!(first.get("Shelf Number"), Some(&FieldValue::Integer(2)));
        assert_eq!(first.key("Vial Position"), "B7");
        assert_eq!(first.key("Date Frozen"), "01/05/2024");
        assert_eq!(first.key("Notes"), "thawed once");
    }

    #[test]
    fn malformed_cells_degrade_instead_of_failing() {
        let set = clean(&table(), &schema());
        let second = &set.records()[1];
        assert_eq!(second.get("Shelf Number"), Some(&FieldValue::Integer(-1)));
        assert_eq!(second.key("Vial Position"), "");
        assert_eq!(second.key("Date Frozen"), "");
        assert_eq!(second.key("Notes"), "");

        // Short rows are padded: sentinel for integers, empty text otherwise.
        let third = &set.records()[2];
        assert_eq!(third.get("Shelf Number"), Some(&FieldValue::Integer(-1)));
        assert_eq!(third.get("Notes"), Some(&FieldValue::Text(String::new())));
    }

    #[test]
    fn cleaning_twice_changes_nothing() {
        let once = clean(&table(), &schema());
        let twice = clean(&once.to_table(), &schema());
        assert_eq!(once, twice);
    }

    #[test]
    fn input_is_left_untouched() {
        let raw = table();
        let before = raw.clone();
        let _ = clean(&raw, &schema());
        assert_eq!(raw, before);
    }
}

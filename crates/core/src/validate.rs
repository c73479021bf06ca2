//! Strict validation of one user-entered submission.
//!
//! Unlike [`crate::normalize`], nothing is coerced here: a value that does
//! not fit its field's rule rejects the submission with a message naming
//! the field and the offending value.

use std::collections::BTreeMap;

use crate::dates::{format_date, parse_month_first};
use crate::error::ValidationError;
use crate::field_value::FieldValue;
use crate::normalize::is_letter_number;
use crate::schema::{Intent, InventorySchema};

/// Raw text typed into the entry form, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    entries: Vec<(String, String)>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`, replacing any earlier entry for it.
    pub fn set(&mut self, field: &str, value: &str) {
        match self.entries.iter_mut().find(|(f, _)| f == field) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((field.to_string(), value.to_string())),
        }
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    fn is_filled(&self, field: &str) -> bool {
        self.get(field).is_some_and(|v| !v.trim().is_empty())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Submission {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut submission = Submission::new();
        for (field, value) in pairs {
            submission.set(field, value);
        }
        submission
    }
}

/// A submission that passed validation.
///
/// `locations` holds the (possibly several) values given for the schema's
/// location field; every other provided field is in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedEntries {
    pub fields: BTreeMap<String, FieldValue>,
    pub locations: Vec<FieldValue>,
}

impl CleanedEntries {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

/// Report every required field left blank, all at once.
pub fn check_required(submission: &Submission, required: &[String]) -> Result<(), ValidationError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| !submission.is_filled(field))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { missing })
    }
}

/// Required-field pre-check for `intent`, then per-field validation.
pub fn validate(
    submission: &Submission,
    schema: &InventorySchema,
    intent: Intent,
) -> Result<CleanedEntries, ValidationError> {
    check_required(submission, schema.required_fields(intent))?;
    validate_fields(submission, schema)
}

/// Per-field validation only. Blank entries are "not provided" and skipped;
/// the first bad field stops the scan.
pub fn validate_fields(
    submission: &Submission,
    schema: &InventorySchema,
) -> Result<CleanedEntries, ValidationError> {
    let mut cleaned = CleanedEntries::default();

    for (field, raw) in submission.entries() {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        if schema.is_location_field(field) {
            for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                cleaned.locations.push(validate_value(field, token, schema)?);
            }
            continue;
        }

        let typed = validate_value(field, value, schema)?;
        cleaned.fields.insert(field.to_string(), typed);
    }

    Ok(cleaned)
}

fn validate_value(
    field: &str,
    value: &str,
    schema: &InventorySchema,
) -> Result<FieldValue, ValidationError> {
    if schema.is_integer_field(field) {
        return value
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| ValidationError::NotInteger {
                field: field.to_string(),
                value: value.to_string(),
            });
    }

    if schema.is_letter_number_field(field) {
        return if is_letter_number(value) {
            Ok(FieldValue::Text(value.to_uppercase()))
        } else {
            Err(ValidationError::NotLetterNumber {
                field: field.to_string(),
                value: value.to_string(),
            })
        };
    }

    if schema.is_date_field(field) {
        return parse_month_first(value)
            .map(|d| FieldValue::Text(format_date(d)))
            .ok_or_else(|| ValidationError::InvalidDate {
                field: field.to_string(),
                value: value.to_string(),
            });
    }

    Ok(FieldValue::Text(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::clean_cell;

    fn schema() -> InventorySchema {
        InventorySchema::new("t", "Vial Position")
            .with_integer_fields(&["Shelf Number", "Rack Number"])
            .with_letter_number_fields(&["Box Position", "Vial Position"])
            .with_date_field("Date Frozen")
            .with_required(Intent::Add, &["Shelf Number", "Rack Number", "Vial Label"])
    }

    #[test]
    fn required_check_lists_every_missing_field() {
        let submission = Submission::from([("Shelf Number", "1"), ("Rack Number", "  ")]);
        let err = validate(&submission, &schema(), Intent::Add).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRequired {
                missing: vec!["Rack Number".into(), "Vial Label".into()],
            }
        );
        assert_eq!(err.to_string(), "Please fill in: Rack Number, Vial Label");
    }

    #[test]
    fn location_tokens_are_split_and_uppercased() {
        let submission = Submission::from([("Vial Position", " a1, b12 ,, c3 ")]);
        let cleaned = validate_fields(&submission, &schema()).unwrap();
        assert_eq!(
            cleaned.locations,
            vec![
                FieldValue::Text("A1".into()),
                FieldValue::Text("B12".into()),
                FieldValue::Text("C3".into()),
            ]
        );
    }

    #[test]
    fn bad_location_token_is_named() {
        let submission = Submission::from([("Vial Position", "A1, 7B")]);
        let err = validate_fields(&submission, &schema()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotLetterNumber {
                field: "Vial Position".into(),
                value: "7B".into(),
            }
        );
    }

    #[test]
    fn integer_fields_do_not_fall_back_to_sentinel() {
        let submission = Submission::from([("Shelf Number", "two")]);
        let err = validate_fields(&submission, &schema()).unwrap_err();
        assert!(matches!(err, ValidationError::NotInteger { ref value, .. } if value == "two"));
    }

    #[test]
    fn first_bad_field_wins() {
        let submission = Submission::from([("Shelf Number", "x"), ("Box Position", "12")]);
        let err = validate_fields(&submission, &schema()).unwrap_err();
        assert_eq!(err.fields(), vec!["Shelf Number"]);
    }

    #[test]
    fn date_is_strict_here_but_lenient_in_bulk() {
        let submission = Submission::from([("Date Frozen", "13/40/2024")]);
        let err = validate_fields(&submission, &schema()).unwrap_err();
        assert_eq!(err.fields(), vec!["Date Frozen"]);
        assert!(err.to_string().contains("Date Frozen"));

        let bulk = clean_cell(&FieldValue::Text("13/40/2024".into()), "Date Frozen", &schema());
        assert_eq!(bulk, FieldValue::Text(String::new()));
    }

    #[test]
    fn valid_date_is_canonicalized() {
        let submission = Submission::from([("Date Frozen", "6/3/2025")]);
        let cleaned = validate_fields(&submission, &schema()).unwrap();
        assert_eq!(cleaned.get("Date Frozen"), Some(&FieldValue::Text("06/03/2025".into())));
    }

    #[test]
    fn blank_and_plain_fields() {
        let submission = Submission::from([("Vial Label", "  HeLa p4 "), ("Box Position", "")]);
        let cleaned = validate_fields(&submission, &schema()).unwrap();
        assert_eq!(cleaned.get("Vial Label"), Some(&FieldValue::Text("HeLa p4".into())));
        assert!(cleaned.get("Box Position").is_none());
        assert!(cleaned.locations.is_empty());
    }

    #[test]
    fn integer_location_tokens() {
        let schema = InventorySchema::new("t", "Slot Number").with_integer_fields(&["Slot Number"]);
        let ok = validate_fields(&Submission::from([("Slot Number", "1, 2")]), &schema).unwrap();
        assert_eq!(ok.locations, vec![FieldValue::Integer(1), FieldValue::Integer(2)]);

        let err = validate_fields(&Submission::from([("Slot Number", "1, x")]), &schema).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for Slot Number: 'x' must be an integer");
    }
}

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::dates::CANONICAL_DATE_FORMAT;

/// Sentinel stored in integer columns when the source cell is missing or
/// cannot be read as a whole number.
pub const MISSING_INTEGER: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl FieldValue {
    /// Null, or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Display form used for comparisons, previews and spreadsheet text.
    ///
    /// Whole floats drop their decimal part (`3.0` -> `"3"`), timestamps at
    /// midnight render as a bare `MM/DD/YYYY` date.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            FieldValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            FieldValue::Timestamp(ts) => {
                if ts.time().num_seconds_from_midnight() == 0 {
                    ts.format(CANONICAL_DATE_FORMAT).to_string()
                } else {
                    ts.format("%m/%d/%Y %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Trimmed display form. Two values are the "same cell" for exact-match
    /// purposes when their keys are equal.
    pub fn key(&self) -> String {
        self.display().trim().to_string()
    }

    /// Best-effort whole-number reading: integers, whole floats, and text
    /// holding either.
    pub fn to_whole_number(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            FieldValue::Text(s) => parse_whole_number(s),
            _ => None,
        }
    }
}

/// Parses `"12"`, `" 12 "` or `"12.0"` as 12. Non-whole numbers are rejected.
pub fn parse_whole_number(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Some(f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn whole_floats_display_without_decimals() {
        assert_eq!(FieldValue::Float(3.0).display(), "3");
        assert_eq!(FieldValue::Float(2.5).display(), "2.5");
    }

    #[test]
    fn midnight_timestamp_displays_as_date() {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(FieldValue::Timestamp(ts).display(), "06/30/2024");
    }

    #[test]
    fn whole_number_parsing() {
        assert_eq!(parse_whole_number(" 12 "), Some(12));
        assert_eq!(parse_whole_number("4.0"), Some(4));
        assert_eq!(parse_whole_number("4.5"), None);
        assert_eq!(parse_whole_number("abc"), None);
        assert_eq!(FieldValue::Text("7".into()).to_whole_number(), Some(7));
        assert_eq!(FieldValue::Boolean(true).to_whole_number(), None);
    }
}

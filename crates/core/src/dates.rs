//! Month-first calendar date parsing.
//!
//! Numeric dates are always read month first (`06/30/2024`), two-digit years
//! follow the chrono `%y` convention (00-68 -> 20xx, 69-99 -> 19xx).

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::field_value::FieldValue;

pub const CANONICAL_DATE_FORMAT: &str = "%m/%d/%Y";

static NUMERIC_MDY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2}|\d{4})(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .expect("static regex")
});

static NUMERIC_YMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .expect("static regex")
});

const NAMED_MONTH_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn expand_two_digit_year(yy: i32) -> i32 {
    if yy <= 68 { 2000 + yy } else { 1900 + yy }
}

/// Parse a free-form date, month first. Returns `None` for anything that is
/// not a real calendar date (`13/40/2024`, `hello`, empty input).
pub fn parse_month_first(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_MDY.captures(s) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year_digits = &caps[3];
        let mut year: i32 = year_digits.parse().ok()?;
        if year_digits.len() == 2 {
            year = expand_two_digit_year(year);
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = NUMERIC_YMD.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    NAMED_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Canonical `MM/DD/YYYY` rendering of a date-bearing cell, if it holds one.
pub fn canonical_date(value: &FieldValue) -> Option<String> {
    let date = match value {
        FieldValue::Timestamp(ts) => Some(ts.date()),
        FieldValue::Text(s) => parse_month_first(s),
        _ => None,
    }?;
    Some(format_date(date))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_first_numeric() {
        assert_eq!(parse_month_first("06/30/2024"), Some(ymd(2024, 6, 30)));
        assert_eq!(parse_month_first("6/3/2024"), Some(ymd(2024, 6, 3)));
        assert_eq!(parse_month_first("6-3-24"), Some(ymd(2024, 6, 3)));
        assert_eq!(parse_month_first("12/31/99"), Some(ymd(1999, 12, 31)));
    }

    #[test]
    fn iso_and_named_months() {
        assert_eq!(parse_month_first("2024-06-30"), Some(ymd(2024, 6, 30)));
        assert_eq!(parse_month_first("2024-06-30 00:00:00"), Some(ymd(2024, 6, 30)));
        assert_eq!(parse_month_first("June 30, 2024"), Some(ymd(2024, 6, 30)));
        assert_eq!(parse_month_first("30 Jun 2024"), Some(ymd(2024, 6, 30)));
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert_eq!(parse_month_first("13/40/2024"), None);
        assert_eq!(parse_month_first("02/30/2024"), None);
        assert_eq!(parse_month_first("not a date"), None);
        assert_eq!(parse_month_first(""), None);
    }

    #[test]
    fn canonical_rendering() {
        assert_eq!(
            canonical_date(&FieldValue::Text("7/4/2023".into())).as_deref(),
            Some("07/04/2023")
        );
        assert_eq!(
            canonical_date(&FieldValue::Timestamp(midnight(ymd(2023, 7, 4)))).as_deref(),
            Some("07/04/2023")
        );
        assert_eq!(canonical_date(&FieldValue::Integer(45000)), None);
    }
}

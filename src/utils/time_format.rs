use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AttendanceError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Parses a required `YYYY-MM-DD` field. Only the zero-padded form is
/// accepted, so the value formats back to exactly what was submitted.
pub fn parse_date(field: &'static str, value: Option<&str>) -> Result<NaiveDate, AttendanceError> {
    let value = required(field, value)?;
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .filter(|date| format_date(*date) == value)
        .ok_or_else(|| AttendanceError::MalformedInput {
            field,
            reason: format!("expected YYYY-MM-DD, got {value:?}"),
        })
}

/// Parses a required `HH:MM:SS` field, zero-padded.
pub fn parse_time(field: &'static str, value: Option<&str>) -> Result<NaiveTime, AttendanceError> {
    let value = required(field, value)?;
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .ok()
        .filter(|time| format_time(*time) == value)
        .ok_or_else(|| AttendanceError::MalformedInput {
            field,
            reason: format!("expected HH:MM:SS, got {value:?}"),
        })
}

/// Parses an optional `HH:MM:SS` field; blank counts as absent.
pub fn parse_optional_time(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveTime>, AttendanceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_time(field, Some(v)).map(Some),
        None => Ok(None),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn format_date_time(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, AttendanceError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AttendanceError::MissingField(field)),
    }
}

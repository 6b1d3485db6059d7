//! Cover date normalization
//!
//! The cover slide shows the reporting month as "<Spanish month> <year>".
//! Callers send that month in several shapes: a `YYYY-MM` string, an ISO-8601
//! date or timestamp, or a spreadsheet serial day number.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;
use crate::error::{Error, Result};

/// Text shown on the cover when the date cannot be understood
pub const INVALID_DATE: &str = "Fecha no válida";

const MONTHS_ES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];

/// Cover date expression types
#[derive(Debug, Clone, PartialEq)]
pub enum CoverDate {
    /// `2025-03`
    YearMonth { year: i32, month: u32 },
    /// ISO-8601 date or date-time, already shifted to its own offset
    Timestamp(NaiveDateTime),
    /// Spreadsheet serial number (days since 1899-12-30)
    Serial(f64),
}

/// Parse a JSON value into a CoverDate
///
/// Supported formats:
/// - `"2025-03"` → YearMonth
/// - `"2025-03-15"`, `"2025-03-15T10:30:00Z"`, `"2025-03-15T10:30:00-03:00"` → Timestamp
/// - `45731` → Serial
pub fn parse_cover_date(value: &Value) -> Result<CoverDate> {
    match value {
        Value::String(s) => parse_date_string(s),
        Value::Number(n) => n
            .as_f64()
            .filter(|days| days.is_finite())
            .map(CoverDate::Serial)
            .ok_or_else(|| Error::InvalidPayload(format!("Unusable date serial: {}", n))),
        other => Err(Error::InvalidPayload(format!("Unsupported date value: {}", other))),
    }
}

fn parse_date_string(raw: &str) -> Result<CoverDate> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(Error::InvalidPayload("Empty date".to_string()));
    }

    // YYYY-MM
    if let Some((year, month)) = s.split_once('-') {
        if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
            if NaiveDate::from_ymd_opt(year, month, 1).is_some() {
                return Ok(CoverDate::YearMonth { year, month });
            }
        }
    }

    // Offset-aware timestamps; a trailing Z means UTC
    let with_offset = match s.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&with_offset) {
        return Ok(CoverDate::Timestamp(dt.naive_local()));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(CoverDate::Timestamp(dt));
        }
    }

    if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(CoverDate::Timestamp(dt));
    }

    Err(Error::InvalidPayload(format!("Unable to parse date: {}", s)))
}

/// Resolve a CoverDate to the first day of its month
pub fn resolve_month(date: &CoverDate) -> Option<NaiveDate> {
    let resolved = match date {
        CoverDate::YearMonth { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)?,
        CoverDate::Timestamp(dt) => dt.date(),
        CoverDate::Serial(days) => {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            let whole_days = days.floor();
            if whole_days.abs() > 3_000_000.0 {
                return None;
            }
            epoch.checked_add_signed(Duration::days(whole_days as i64))?
        }
    };
    resolved.with_day(1)
}

/// Format a date as "<Spanish month> <year>"
/// Example: "Marzo 2025"
pub fn format_month_year(date: &NaiveDate) -> String {
    format!("{} {}", MONTHS_ES[date.month0() as usize], date.year())
}

/// Turn whatever the caller sent as `fecha_portada` into cover text
///
/// Absent, empty, zero or unparseable values all become [`INVALID_DATE`].
pub fn normalize_cover_date(value: Option<&Value>) -> String {
    let value = match value {
        Some(v) if !is_blank(v) => v,
        _ => return INVALID_DATE.to_string(),
    };

    parse_cover_date(value)
        .ok()
        .and_then(|expr| resolve_month(&expr))
        .map(|date| format_month_year(&date))
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

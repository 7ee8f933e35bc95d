use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use regex::Regex;

use crate::{
    data::{Value, midnight},
    frame::{Column, ColumnType, Table},
};

/// Whole-column formats, tried in order before falling back to per-value
/// parsing.
pub const EXPLICIT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const NAMED_MONTH_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y", "%d-%b-%Y"];

static SEPARATED_DATE: OnceLock<Regex> = OnceLock::new();

fn separated_date() -> &'static Regex {
    SEPARATED_DATE.get_or_init(|| {
        Regex::new(r"^(\d{1,4})[./-](\d{1,2})[./-](\d{1,4})$").expect("valid date pattern")
    })
}

/// A column is parsed as a date when its lowercased name contains any of
/// `keywords`.
pub fn is_date_candidate<S: AsRef<str>>(name: &str, keywords: &[S]) -> bool {
    let lowered = name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.as_ref().to_lowercase()))
}

/// Parses a column into UTC datetimes. The first explicit format that reads
/// every non-null value is applied to the whole column; otherwise each value
/// goes through [`parse_flexible`]. Values that cannot be read become null.
pub fn parse_date_column(column: &Column) -> Column {
    if column.kind() == ColumnType::DateTime {
        return column.clone();
    }
    let texts = column
        .values()
        .iter()
        .map(|cell| match cell {
            Some(Value::DateTime(dt)) => Err(*dt),
            Some(other) => Ok(Some(other.as_display())),
            None => Ok(None),
        })
        .collect::<Vec<_>>();

    let whole_column_format = EXPLICIT_DATE_FORMATS.iter().find(|fmt| {
        let mut any = false;
        let all = texts.iter().all(|text| match text {
            Ok(Some(s)) => {
                any = true;
                NaiveDate::parse_from_str(s.trim(), fmt).is_ok()
            }
            Ok(None) => true,
            Err(_) => false,
        });
        any && all
    });

    let values = texts
        .iter()
        .map(|text| match text {
            Err(dt) => Some(*dt),
            Ok(None) => None,
            Ok(Some(s)) => match whole_column_format {
                Some(fmt) => NaiveDate::parse_from_str(s.trim(), fmt).ok().map(midnight),
                None => parse_flexible(s),
            },
        })
        .map(|parsed| parsed.map(Value::DateTime))
        .collect::<Vec<_>>();

    debug!(
        "Date column '{}' parsed with {} ({} of {} value(s) readable)",
        column.name(),
        whole_column_format.copied().unwrap_or("flexible parser"),
        values.iter().flatten().count(),
        column.non_null().count()
    );
    Column::with_type(column.name(), ColumnType::DateTime, values)
}

/// Best-effort parser for a single date or timestamp. Ambiguous numeric
/// dates are read day first; a day-first reading that is impossible (month
/// above 12) is retried month first.
pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    if let Some(date) = parse_separated_date(value) {
        return Some(midnight(date));
    }
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok().map(midnight);
    }
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(midnight);
    }
    for fmt in NAMED_MONTH_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(midnight(date));
        }
    }
    None
}

fn parse_separated_date(value: &str) -> Option<NaiveDate> {
    let caps = separated_date().captures(value)?;
    let first = &caps[1];
    let second: u32 = caps[2].parse().ok()?;
    let third = &caps[3];
    if first.len() == 4 {
        let year: i32 = first.parse().ok()?;
        let day: u32 = third.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, second, day);
    }
    let leading: u32 = first.parse().ok()?;
    let year = expand_year(third)?;
    NaiveDate::from_ymd_opt(year, second, leading)
        .or_else(|| NaiveDate::from_ymd_opt(year, leading, second))
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        4 => Some(year),
        1 | 2 if year <= 68 => Some(2000 + year),
        1 | 2 => Some(1900 + year),
        _ => None,
    }
}

/// Parses every date-candidate column of `table`.
pub fn parse_date_columns<S: AsRef<str>>(table: &Table, keywords: &[S]) -> Table {
    table.map_columns(|column| {
        if is_date_candidate(column.name(), keywords) {
            parse_date_column(column)
        } else {
            column.clone()
        }
    })
}

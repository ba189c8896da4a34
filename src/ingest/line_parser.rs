//! CSV/TXT line parsing with delimiter and date/time layout detection.
//!
//! Accepted layouts (delimiter `;` when present, `,` otherwise):
//!
//! ```text
//! 2024-01-02 09:30:00,1.10,1.12,1.09,1.11,1200
//! 20240102;09:30;1.10;1.12;1.09;1.11;1200
//! 02.01.2024;09:30;1.10;1.12;1.09;1.11;1200
//! "2024-01-02 09:30","1.10","1.12","1.09","1.11"
//! 1704187800,1.10,1.12,1.09,1.11
//! ```
//!
//! Lines that cannot be turned into a record are skipped, never reported.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::core::OhlcvBar;

const MIN_COLUMNS: usize = 5;

/// Epoch values below this are taken as seconds rather than milliseconds.
const SECONDS_EPOCH_LIMIT: f64 = 1e11;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%d-%m-%Y"];

/// Picks `;` when the line contains one, `,` otherwise.
#[must_use]
pub fn detect_delimiter(line: &str) -> char {
    if line.contains(';') { ';' } else { ',' }
}

fn reader_builder(delimiter: char, capacity: usize) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter as u8)
        .buffer_capacity(capacity.max(64));
    builder
}

/// Parses a block of text. The delimiter is detected once, on the first
/// non-empty line.
#[must_use]
pub fn parse_text(text: &str) -> Vec<OhlcvBar> {
    let Some(first) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Vec::new();
    };
    let mut reader =
        reader_builder(detect_delimiter(first), 64 * 1024).from_reader(text.as_bytes());
    reader
        .records()
        .filter_map(Result::ok)
        .filter_map(|record| parse_record(&record))
        .collect()
}

/// Parses every line, silently skipping the ones that do not yield a record.
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<OhlcvBar> {
    lines.into_iter().filter_map(parse_line).collect()
}

/// Parses one line into a raw (unsanitized) record.
#[must_use]
pub fn parse_line(line: &str) -> Option<OhlcvBar> {
    let line = line.trim();
    let mut reader =
        reader_builder(detect_delimiter(line), line.len()).from_reader(line.as_bytes());
    let record = reader.records().next()?.ok()?;
    parse_record(&record)
}

/// Turns one CSV record into a raw record.
#[must_use]
pub fn parse_record(record: &StringRecord) -> Option<OhlcvBar> {
    let first = record.get(0)?;
    if !first.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if record.len() < MIN_COLUMNS {
        return None;
    }
    let columns: Vec<&str> = record.iter().collect();

    let (time, values) = if is_date_column(columns[0]) && columns[1].contains(':') {
        let stamp = format!("{}T{}", normalize_date(columns[0]), columns[1]);
        (parse_timestamp(&stamp)?, &columns[2..])
    } else {
        (parse_timestamp(columns[0])?, &columns[1..])
    };
    if time <= 0 {
        return None;
    }

    let open = parse_number(values.first()?)?;
    let close = parse_number(values.get(3)?)?;
    let high = values
        .get(1)
        .and_then(|raw| parse_number(raw))
        .unwrap_or_else(|| open.max(close));
    let low = values
        .get(2)
        .and_then(|raw| parse_number(raw))
        .unwrap_or_else(|| open.min(close));
    let volume = values
        .get(4)
        .and_then(|raw| parse_number(raw))
        .unwrap_or(0.0);

    Some(OhlcvBar::raw(time, open, high, low, close, volume))
}

/// Parses a date, date-time or numeric epoch into epoch milliseconds (UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    parse_calendar(raw).or_else(|| parse_epoch(raw))
}

fn parse_calendar(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    let is_all_digits = raw.bytes().all(|b| b.is_ascii_digit());
    if is_all_digits {
        if raw.len() != 8 {
            return None;
        }
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }

    let normalized = raw.replacen(' ', "T", usize::from(looks_iso_dashed(raw)));
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, format))
        {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

fn parse_epoch(raw: &str) -> Option<i64> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let millis = if value < SECONDS_EPOCH_LIMIT {
        value * 1000.0
    } else {
        value
    };
    Some(millis.round() as i64)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// `YYYYMMDD`, or a dotted/dashed/slashed calendar date.
fn is_date_column(column: &str) -> bool {
    let bytes = column.as_bytes();
    if bytes.len() == 8 && bytes.iter().all(u8::is_ascii_digit) {
        return true;
    }
    let parts: Vec<&str> = column.split(['.', '-', '/']).collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Rewrites a date column as `YYYY-MM-DD`: `YYYYMMDD`, year-first with any
/// separator, or day-first `DD.MM.YYYY`/`DD-MM-YYYY`.
fn normalize_date(column: &str) -> String {
    let bytes = column.as_bytes();
    if bytes.len() == 8 && bytes.iter().all(u8::is_ascii_digit) {
        return format!("{}-{}-{}", &column[..4], &column[4..6], &column[6..]);
    }
    let parts: Vec<&str> = column.split(['.', '-', '/']).collect();
    match parts.as_slice() {
        [year, month, day] if year.len() == 4 => format!("{year}-{month:0>2}-{day:0>2}"),
        [day, month, year] if year.len() == 4 => format!("{year}-{month:0>2}-{day:0>2}"),
        _ => column.to_owned(),
    }
}

fn looks_iso_dashed(raw: &str) -> bool {
    raw.len() > 10 && raw.as_bytes()[4] == b'-' && raw.as_bytes()[10] == b' '
}

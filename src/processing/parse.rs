use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::processing::types::{COLUMN_NAMES, ConvertError, FORMAT_VERSION, Reading};

const VERSION_MARKER: &str = "ver";
const COLUMN_MARKER: &str = "col";
const TOTALS_MARKER: &str = "tot";
const NAME_PREFIX: &[u8] = b"tr";
const NAME_DIGITS: usize = 12;

/// Parse the rows of one X-Trainer CSV export.
///
/// The first two rows must be the `ver` and `col` markers. Data rows follow
/// until an optional `tot` summary row. Rows that do not carry exactly six
/// fields (typically a truncated last line) are skipped; any other malformed
/// value rejects the whole file.
pub fn parse_readings(file: &str, content: &str) -> Result<Vec<Reading>, ConvertError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = reader.records();

    let version = rows
        .next()
        .transpose()
        .map_err(|err| ConvertError::format(file, err.to_string()))?
        .ok_or_else(|| ConvertError::format(file, "missing version header"))?;
    check_version(file, &version)?;

    let columns = rows
        .next()
        .transpose()
        .map_err(|err| ConvertError::format(file, err.to_string()))?
        .ok_or_else(|| ConvertError::format(file, "missing column header"))?;
    check_columns(file, &columns)?;

    let mut readings = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let row = row.map_err(|err| ConvertError::format(file, err.to_string()))?;
        if row.get(0).map(str::trim) == Some(TOTALS_MARKER) {
            break;
        }
        if row.len() != COLUMN_NAMES.len() {
            skipped += 1;
            continue;
        }
        readings.push(parse_row(file, &row)?);
    }

    if skipped > 0 {
        warn!(file, skipped, "skipped incomplete rows");
    }
    debug!(file, rows = readings.len(), "parsed X-Trainer rows");
    Ok(readings)
}

fn check_version(file: &str, row: &StringRecord) -> Result<(), ConvertError> {
    match (row.get(0).map(str::trim), row.get(1).map(str::trim)) {
        (Some(VERSION_MARKER), Some(FORMAT_VERSION)) => Ok(()),
        (Some(VERSION_MARKER), version) => Err(ConvertError::format(
            file,
            format!("unknown format version {:?}", version.unwrap_or_default()),
        )),
        _ => Err(ConvertError::format(file, "first row is not a version header")),
    }
}

fn check_columns(file: &str, row: &StringRecord) -> Result<(), ConvertError> {
    if row.get(0).map(str::trim) != Some(COLUMN_MARKER) {
        return Err(ConvertError::format(file, "second row is not a column header"));
    }
    let names: Vec<&str> = row.iter().skip(1).map(str::trim).collect();
    if names != COLUMN_NAMES {
        return Err(ConvertError::format(
            file,
            format!("unknown statistics header {}", names.join(",")),
        ));
    }
    Ok(())
}

fn parse_row(file: &str, row: &StringRecord) -> Result<Reading, ConvertError> {
    let line = row.position().map_or(0, |position| position.line());
    let mut values = [0i32; 6];
    for (slot, (raw, name)) in values.iter_mut().zip(row.iter().zip(COLUMN_NAMES)) {
        *slot = raw.trim().parse().map_err(|_| {
            ConvertError::format(file, format!("line {line}: invalid {name} value {raw:?}"))
        })?;
    }

    // The time column only counts seconds within the file; timestamps are
    // derived from the file name instead.
    let [_time, pulse, cadence, power, grade, speed] = values;
    Ok(Reading {
        pulse,
        cadence,
        power,
        grade,
        speed: f64::from(speed),
    })
}

/// Nominal start time encoded in an export's file name.
///
/// Names look like `<anything>trYYYYMMDDhhmm.csv`, matched case-insensitively.
pub fn parse_start_time(path: &Path) -> Result<NaiveDateTime, ConvertError> {
    let display = path.display().to_string();
    let unknown = || ConvertError::format(&display, "unknown file naming format");

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .ok_or_else(unknown)?;
    let stem = name.strip_suffix(".csv").ok_or_else(unknown)?.as_bytes();
    if stem.len() < NAME_PREFIX.len() + NAME_DIGITS {
        return Err(unknown());
    }

    let (head, digits) = stem.split_at(stem.len() - NAME_DIGITS);
    if !head.ends_with(NAME_PREFIX) || !digits.iter().all(u8::is_ascii_digit) {
        return Err(unknown());
    }

    let year = decimal(&digits[0..4]);
    let month = decimal(&digits[4..6]);
    let day = decimal(&digits[6..8]);
    let hour = decimal(&digits[8..10]);
    let minute = decimal(&digits[10..12]);

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| {
            ConvertError::format(
                &display,
                format!("file name encodes an impossible date/time {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}"),
            )
        })
}

fn decimal(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, digit| acc * 10 + u32::from(digit - b'0'))
}

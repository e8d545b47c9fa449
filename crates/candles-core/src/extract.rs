//! Row extraction: one raw CSV row to one [`OhlcRecord`].

use time::OffsetDateTime;

use crate::domain::OhlcRecord;
use crate::error::RowError;
use crate::fields::{CanonicalField, FieldIndexes};

/// Convert `row` using the positions in `indexes`.
///
/// Only referenced columns are read, so rows may carry extra cells. A field
/// without a resolved position keeps its unset value, which then fails the
/// completeness check.
pub fn extract_record<S: AsRef<str>>(
    row: &[S],
    indexes: &FieldIndexes,
) -> Result<OhlcRecord, RowError> {
    let mut record = OhlcRecord::unset();

    if let Some(cell) = lookup_cell(row, indexes, CanonicalField::Symbol)? {
        record.symbol = cell.trim().to_string();
    }

    // The timestamp cell is parsed as-is, surrounding whitespace is an error.
    if let Some(cell) = lookup_cell(row, indexes, CanonicalField::Unix)? {
        let seconds: i64 = cell.parse().map_err(|_| RowError::InvalidNumber {
            field: CanonicalField::Unix,
            value: cell.to_string(),
        })?;
        record.time = OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|_| RowError::TimestampOutOfRange { value: seconds })?;
    }

    for (field, slot) in [
        (CanonicalField::Open, &mut record.open),
        (CanonicalField::High, &mut record.high),
        (CanonicalField::Low, &mut record.low),
        (CanonicalField::Close, &mut record.close),
    ] {
        if let Some(cell) = lookup_cell(row, indexes, field)? {
            *slot = parse_price(field, cell)?;
        }
    }

    if record.is_incomplete() {
        return Err(RowError::Incomplete);
    }

    Ok(record)
}

fn lookup_cell<'r, S: AsRef<str>>(
    row: &'r [S],
    indexes: &FieldIndexes,
    field: CanonicalField,
) -> Result<Option<&'r str>, RowError> {
    let Some(index) = indexes.get(field) else {
        return Ok(None);
    };

    row.get(index)
        .map(|cell| Some(cell.as_ref()))
        .ok_or(RowError::MissingCell {
            field,
            index,
            len: row.len(),
        })
}

fn parse_price(field: CanonicalField, cell: &str) -> Result<f64, RowError> {
    cell.trim().parse().map_err(|_| RowError::InvalidNumber {
        field,
        value: cell.to_string(),
    })
}
